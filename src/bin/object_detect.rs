//! object_detect - detection over a video stream or a single image.

fn main() -> anyhow::Result<()> {
    object_detect::cli::run()
}
