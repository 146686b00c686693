//! CLI subcommands.

pub mod config;
pub mod estimate;
pub mod features;

use std::path::Path;

use image::RgbImage;

use crate::error::CliError;

/// Decode an image file and convert it to RGB8.
pub fn load_image(path: &Path) -> Result<RgbImage, CliError> {
    let image = image::open(path).map_err(|source| CliError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}
