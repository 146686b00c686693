//! `airlens features`: inspect what the camera tier sees.

use std::path::PathBuf;

use airlens::aqi::{sky_description, AqiLevel};
use airlens::config::ConfigFile;
use airlens::features::FeatureExtractor;
use airlens::tier::{CameraModel, HeuristicCameraModel};
use clap::Args;

use super::load_image;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Args)]
pub struct FeaturesArgs {
    /// Sky photograph (PNG or JPEG)
    #[arg(long, value_name = "PATH")]
    pub image: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the features command.
pub fn run(args: FeaturesArgs, config: &ConfigFile) -> Result<(), CliError> {
    let engine = config.to_engine_config()?;
    let image = load_image(&args.image)?;

    let features = FeatureExtractor::new(engine.extractor).extract(&image)?;
    let model = HeuristicCameraModel::new(engine.camera)?;
    let result = model.estimate(&features)?;

    let level = AqiLevel::from_pm25(result.value());
    let description = sky_description(&features, result.value());

    if args.json {
        output::print_features_json(&features, &result, level, description)
    } else {
        output::print_features(&features, &result, level, description);
        Ok(())
    }
}
