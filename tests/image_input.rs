use std::path::Path;

use anyhow::Result;
use image::{Rgb, RgbImage};

use object_detect::{
    infer_image, list_samples, select_sample, ChannelOrder, Confidence, StubBackend,
};

fn write_image(path: &Path, shade: u8) -> Result<()> {
    let image = RgbImage::from_fn(24, 16, |x, y| Rgb([shade, x as u8 * 4, y as u8 * 8]));
    image.save(path)?;
    Ok(())
}

#[test]
fn infers_on_an_image_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("street.png");
    write_image(&path, 40)?;

    let mut detector = StubBackend::new();
    let confidence = Confidence::new(0.05)?;
    let first = infer_image(&mut detector, &path, confidence)?;
    let second = infer_image(&mut detector, &path, confidence)?;

    assert_eq!(first.annotated.width(), 24);
    assert_eq!(first.annotated.height(), 16);
    assert_eq!(first.annotated.order(), ChannelOrder::Rgb);
    assert_eq!(first.detections, second.detections);

    let out = dir.path().join("prediction.png");
    first.annotated.save(&out)?;
    assert!(out.is_file());
    Ok(())
}

#[test]
fn missing_image_is_an_error() {
    let mut detector = StubBackend::new();
    let err = infer_image(
        &mut detector,
        Path::new("does/not/exist.png"),
        Confidence::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("failed to open image"));
}

#[test]
fn samples_are_sorted_and_filtered() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_image(&dir.path().join("b.png"), 1)?;
    write_image(&dir.path().join("a.jpg"), 2)?;
    std::fs::write(dir.path().join("notes.txt"), "not an image")?;

    let samples = list_samples(dir.path())?;
    let names: Vec<_> = samples
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.jpg", "b.png"]);

    assert_eq!(select_sample(dir.path(), 2)?, dir.path().join("b.png"));
    assert!(select_sample(dir.path(), 0).is_err());
    assert!(select_sample(dir.path(), 3).is_err());
    Ok(())
}

#[test]
fn empty_sample_directory_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = select_sample(dir.path(), 1).unwrap_err();
    assert!(err.to_string().contains("no sample images"));
    Ok(())
}
