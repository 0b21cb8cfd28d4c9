//! object_detect - run a detector over a video stream or a single image.
//!
//! `video` drives a stream session frame by frame and prints the unique labels
//! seen; `image` runs the detector once and writes the annotated picture.

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, ConfigOverrides};
use crate::detect::{BackendRegistry, StubBackend};
use crate::image_input::{infer_image, select_sample};
use crate::ingest::{open_source, VideoSource};
use crate::session::{CancelToken, SessionConfig, StreamSession};
use crate::ui::{TerminalPresenter, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "object_detect",
    version,
    about = "Object detection over images and video streams"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the detector over every frame of a video and list the unique objects seen
    Video {
        /// Video file path or stub:// URL
        #[arg(long)]
        source: Option<String>,

        /// Custom frame width (defaults to the video's native width)
        #[arg(long)]
        width: Option<u32>,

        /// Custom frame height (defaults to the video's native height)
        #[arg(long)]
        height: Option<u32>,

        /// Write each annotated frame as PNG into this directory
        #[arg(long, value_name = "DIR")]
        save_frames: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run the detector once on an image file
    Image {
        /// Image to run on
        #[arg(long, value_name = "PATH", conflicts_with = "sample_dir")]
        image: Option<PathBuf>,

        /// Directory of sample images to choose from
        #[arg(long, value_name = "DIR")]
        sample_dir: Option<PathBuf>,

        /// 1-based index into the sorted sample images
        #[arg(long, default_value_t = 1)]
        sample_index: usize,

        /// Where to write the annotated image
        #[arg(long, default_value = "prediction.png")]
        output: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Config file (JSON, or TOML by extension)
    #[arg(long, env = "DETECT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Detector backend (stub, tract)
    #[arg(long)]
    backend: Option<String>,

    /// ONNX model file for the tract backend
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Class names file, one per line (defaults to COCO)
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Confidence threshold in (0, 1]
    #[arg(long)]
    confidence: Option<f32>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

impl CommonArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.backend.clone(),
            model_path: self.model.clone(),
            labels_path: self.labels.clone(),
            confidence: self.confidence,
            ..ConfigOverrides::default()
        }
    }

    fn load_config(&self, overrides: ConfigOverrides) -> Result<AppConfig> {
        AppConfig::load_with(self.config.as_deref(), &overrides)
    }

    fn ui(&self) -> Ui {
        let is_tty = std::io::stderr().is_terminal();
        let stdout_is_tty = std::io::stdout().is_terminal();
        Ui::from_args(Some(&self.ui), is_tty, !stdout_is_tty || self.json)
    }
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Video {
            source,
            width,
            height,
            save_frames,
            common,
        } => cmd_video(source, width, height, save_frames.as_deref(), &common),
        Command::Image {
            image,
            sample_dir,
            sample_index,
            output,
            common,
        } => cmd_image(image, sample_dir, sample_index, &output, &common),
    }
}

fn cmd_video(
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    save_frames: Option<&Path>,
    common: &CommonArgs,
) -> Result<()> {
    let cfg = common.load_config(ConfigOverrides {
        source,
        frame_width: width,
        frame_height: height,
        ..common.overrides()
    })?;
    let confidence = cfg.detector.confidence()?;
    let ui = common.ui();

    let registry = {
        let _stage = ui.stage("Load detector");
        build_registry(&cfg)?
    };
    let backend = registry.resolve(Some(&cfg.detector.backend))?;
    let mut detector = backend
        .lock()
        .map_err(|_| anyhow!("detector lock poisoned"))?;
    detector.warm_up()?;

    let source = {
        let _stage = ui.stage("Open video");
        open_source(&cfg.source)?
    };
    let target = cfg.frame.resolve(source.native_size())?;
    log::info!(
        "processing {} at {} with backend={} confidence={}",
        cfg.source,
        target,
        detector.name(),
        confidence
    );

    let cancel = CancelToken::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || handle.cancel()).context("error setting Ctrl-C handler")?;

    let mut presenter = TerminalPresenter::new(&ui, std::io::stdout().lock()).with_json(common.json);
    if let Some(dir) = save_frames {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create frame directory {}", dir.display()))?;
        presenter = presenter.with_frame_dir(dir.to_path_buf());
    }

    let session = StreamSession::open(source, SessionConfig { target, confidence });
    let summary = session.run(&mut *detector, &mut presenter, &cancel)?;
    log::info!(
        "{} frames processed, ended by {:?}",
        summary.frames_processed,
        summary.end
    );
    Ok(())
}

fn cmd_image(
    image: Option<PathBuf>,
    sample_dir: Option<PathBuf>,
    sample_index: usize,
    output: &Path,
    common: &CommonArgs,
) -> Result<()> {
    let cfg = common.load_config(common.overrides())?;
    let confidence = cfg.detector.confidence()?;
    let ui = common.ui();

    let path = match (image, sample_dir) {
        (Some(path), _) => path,
        (None, Some(dir)) => select_sample(&dir, sample_index)?,
        (None, None) => return Err(anyhow!("pass --image or --sample-dir")),
    };

    let registry = {
        let _stage = ui.stage("Load detector");
        build_registry(&cfg)?
    };
    let backend = registry.resolve(Some(&cfg.detector.backend))?;
    let mut detector = backend
        .lock()
        .map_err(|_| anyhow!("detector lock poisoned"))?;

    let prediction = {
        let _stage = ui.stage("Run detector");
        infer_image(&mut *detector, &path, confidence)?
    };
    prediction.annotated.save(output)?;

    if common.json {
        println!("{}", serde_json::to_string(&prediction.detections)?);
    } else {
        println!("{}: {} detections", path.display(), prediction.detections.len());
        for det in &prediction.detections {
            println!("  - {} ({:.2})", det.label, det.confidence);
        }
        println!("annotated image written to {}", output.display());
    }
    Ok(())
}

/// Stub is always available; model-backed detectors load only when selected.
fn build_registry(cfg: &AppConfig) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());

    #[cfg(feature = "backend-tract")]
    {
        if cfg.detector.backend == "tract" {
            let model_path = &cfg.detector.model_path;
            if !model_path.is_file() {
                return Err(anyhow!(
                    "model file not available: {} (add it to the model folder)",
                    model_path.display()
                ));
            }
            let mut backend =
                crate::detect::TractBackend::new(model_path, cfg.detector.model_input()?)?;
            if let Some(labels) = &cfg.detector.labels_path {
                backend = backend.with_classes(crate::detect::ClassNames::load(labels)?);
            }
            registry.register(backend);
        }
    }

    registry.set_default(&cfg.detector.backend)?;
    Ok(registry)
}
