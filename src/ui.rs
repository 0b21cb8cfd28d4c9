use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::session::{FrameUpdate, Presenter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    pub fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = spinner();
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// One-line stats for a processed frame.
pub fn frame_status(update: &FrameUpdate<'_>) -> String {
    format!(
        "frame {} | height {} | width {} | fps {:.2} | {} detections",
        update.frame_index,
        update.height,
        update.width,
        update.fps,
        update.detections.len()
    )
}

/// Terminal presenter: live stats on stderr, the unique label list on stdout.
///
/// Optionally writes every annotated frame as `frame_000001.png` into a directory.
pub struct TerminalPresenter<W: Write> {
    out: W,
    spinner: Option<ProgressBar>,
    frame_dir: Option<PathBuf>,
    json: bool,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(ui: &Ui, out: W) -> Self {
        Self {
            out,
            spinner: ui.use_pretty().then(spinner),
            frame_dir: None,
            json: false,
        }
    }

    pub fn with_frame_dir(mut self, dir: PathBuf) -> Self {
        self.frame_dir = Some(dir);
        self
    }

    /// Print the final label list as a JSON array instead of a heading and bullets.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn frame(&mut self, update: &FrameUpdate<'_>) -> Result<()> {
        let status = frame_status(update);
        match &self.spinner {
            Some(spinner) => spinner.set_message(status),
            None => eprintln!("{}", status),
        }
        if let Some(dir) = &self.frame_dir {
            let path = dir.join(format!("frame_{:06}.png", update.frame_index));
            update.annotated.save(&path)?;
        }
        Ok(())
    }

    fn finish(&mut self, labels: &[String]) -> Result<()> {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        if self.json {
            serde_json::to_writer(&mut self.out, labels).context("write label list")?;
            writeln!(self.out)?;
        } else {
            writeln!(self.out, "Unique Detected Objects")?;
            if labels.is_empty() {
                writeln!(self.out, "  (none)")?;
            }
            for label in labels {
                writeln!(self.out, "  - {}", label)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Detection;
    use crate::frame::{ChannelOrder, Frame, FrameSize};

    fn plain() -> Ui {
        Ui::from_args(Some("plain"), false, false)
    }

    #[test]
    fn pretty_requires_tty() {
        assert!(!Ui::from_args(Some("pretty"), false, false).use_pretty());
        assert!(Ui::from_args(Some("pretty"), true, true).use_pretty());
        assert!(!Ui::from_args(None, true, true).use_pretty());
        assert!(!plain().use_pretty());
    }

    #[test]
    fn frame_status_lists_dimensions_and_fps() {
        let frame = Frame::filled(FrameSize::new(4, 2).unwrap(), ChannelOrder::Rgb, [0; 3]).unwrap();
        let detections = vec![Detection::new("cat", 0.9)];
        let update = FrameUpdate {
            annotated: &frame,
            detections: &detections,
            height: 2,
            width: 4,
            fps: 12.345,
            frame_index: 7,
        };
        assert_eq!(
            frame_status(&update),
            "frame 7 | height 2 | width 4 | fps 12.35 | 1 detections"
        );
    }

    #[test]
    fn finish_prints_heading_and_labels() {
        let mut presenter = TerminalPresenter::new(&plain(), Vec::new());
        presenter
            .finish(&["cat".to_string(), "dog".to_string()])
            .unwrap();
        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(out, "Unique Detected Objects\n  - cat\n  - dog\n");
    }

    #[test]
    fn finish_prints_json_array() {
        let mut presenter = TerminalPresenter::new(&plain(), Vec::new()).with_json(true);
        presenter.finish(&["cat".to_string()]).unwrap();
        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(out, "[\"cat\"]\n");
    }

    #[test]
    fn frames_are_written_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter =
            TerminalPresenter::new(&plain(), Vec::new()).with_frame_dir(dir.path().to_path_buf());
        let frame = Frame::filled(FrameSize::new(4, 4).unwrap(), ChannelOrder::Bgr, [1, 2, 3]).unwrap();
        presenter
            .frame(&FrameUpdate {
                annotated: &frame,
                detections: &[],
                height: 4,
                width: 4,
                fps: 0.0,
                frame_index: 1,
            })
            .unwrap();
        assert!(dir.path().join("frame_000001.png").is_file());
    }
}
