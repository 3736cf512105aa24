use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Encodes frames with the `image` crate, inferring the format from the
/// path's extension (PNG when there is none).
///
/// Each write goes to a sibling temp file that is then renamed over the
/// target, so a crop being overwritten on every frame is never observed
/// half-written.
#[derive(Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Err(format!(
                "refusing to write a {}x{} image to {}",
                frame.width(),
                frame.height(),
                path.display()
            )
            .into());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
        let staging = staging_path(path);
        frame.to_rgb_image().save_with_format(&staging, format)?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
