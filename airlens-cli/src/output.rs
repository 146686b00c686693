//! Report rendering for the terminal and JSON.

use airlens::aqi::AqiLevel;
use airlens::features::ImageFeatures;
use airlens::orchestrator::{EstimationReport, TierOutcome};
use airlens::TierResult;
use chrono::Local;
use console::{style, StyledObject};
use serde::Serialize;

use crate::error::CliError;

/// JSON envelope for `estimate --json`.
#[derive(Serialize)]
struct ReportJson<'a> {
    generated_at: String,
    aqi: Option<AqiLevel>,
    #[serde(flatten)]
    report: &'a EstimationReport,
}

/// JSON envelope for `features --json`.
#[derive(Serialize)]
struct FeaturesJson<'a> {
    generated_at: String,
    features: &'a ImageFeatures,
    camera: &'a TierResult,
    aqi: AqiLevel,
    description: &'a str,
}

fn timestamp() -> String {
    Local::now().to_rfc3339()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Colour a category roughly like the EPA palette.
fn styled_level(level: AqiLevel) -> StyledObject<&'static str> {
    let name = style(level.name()).bold();
    match level {
        AqiLevel::Good => name.green(),
        AqiLevel::Moderate => name.yellow(),
        AqiLevel::UnhealthyForSensitiveGroups => name.color256(208),
        AqiLevel::Unhealthy => name.red(),
        AqiLevel::VeryUnhealthy => name.magenta(),
        AqiLevel::Hazardous => name.red().reverse(),
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

pub fn print_report_json(report: &EstimationReport) -> Result<(), CliError> {
    print_json(&ReportJson {
        generated_at: timestamp(),
        aqi: report.estimate().map(|e| AqiLevel::from_pm25(e.pm25())),
        report,
    })
}

pub fn print_report(report: &EstimationReport) {
    println!(
        "{}  {}",
        style("AirLens PM2.5 estimate").bold(),
        style(Local::now().format("%Y-%m-%d %H:%M:%S %:z")).dim()
    );
    println!();

    match &report.fused {
        Ok(estimate) => {
            let level = AqiLevel::from_pm25(estimate.pm25());
            println!(
                "  PM2.5       {} µg/m³ ± {:.1}",
                style(format!("{:.1}", estimate.pm25())).bold(),
                estimate.uncertainty()
            );
            println!("  Category    {}", styled_level(level));
            println!("  Confidence  {}", percent(estimate.confidence()));
            println!("  Sources     {} of 3", estimate.sources_available());
            println!("  Advice      {}", level.advice());
        }
        Err(e) => {
            println!("  {}", style(e).red().bold());
        }
    }

    println!();
    println!(
        "  {:<10} {:>8} {:>11} {:>7}",
        style("Tier").underlined(),
        style("PM2.5").underlined(),
        style("Confidence").underlined(),
        style("Weight").underlined()
    );
    let weights = report.estimate().map(|e| *e.weights());
    for (source, outcome) in report.outcomes() {
        match outcome {
            TierOutcome::Available(result) => {
                let weight = weights
                    .and_then(|w| w.get(source))
                    .map(percent)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<10} {:>8.1} {:>11} {:>7}",
                    source.name(),
                    result.value(),
                    percent(result.confidence()),
                    weight
                );
            }
            TierOutcome::Unavailable(reason) => {
                let text = format!("unavailable ({})", reason);
                let text = if reason.is_failure() {
                    style(text).yellow()
                } else {
                    style(text).dim()
                };
                println!("  {:<10} {}", source.name(), text);
            }
        }
    }
}

pub fn print_features_json(
    features: &ImageFeatures,
    camera: &TierResult,
    aqi: AqiLevel,
    description: &str,
) -> Result<(), CliError> {
    print_json(&FeaturesJson {
        generated_at: timestamp(),
        features,
        camera,
        aqi,
        description,
    })
}

pub fn print_features(
    features: &ImageFeatures,
    camera: &TierResult,
    aqi: AqiLevel,
    description: &str,
) {
    println!("{}", style("Image features").bold());
    let rows = [
        ("brightness", features.brightness),
        ("saturation", features.saturation),
        ("blue ratio", features.blue_ratio),
        ("contrast", features.contrast),
        ("haze score", features.haze_score),
        ("colorfulness", features.colorfulness),
    ];
    for (name, value) in rows {
        println!("  {:<13} {:.3}", name, value);
    }
    println!("  {:<13} {}", "samples", features.sample_count);
    println!();
    println!(
        "{}  {:.1} µg/m³ at {} confidence",
        style("Camera tier").bold(),
        camera.value(),
        percent(camera.confidence())
    );
    println!("  {}: {}", styled_level(aqi), description);
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlens::config::EngineConfig;
    use airlens::orchestrator::{EstimationOrchestrator, EstimationRequest};
    use airlens::tier::AerosolObservation;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.95), "95%");
        assert_eq!(percent(0.0), "0%");
    }

    #[test]
    fn test_report_json_envelope() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let orchestrator = EstimationOrchestrator::new(EngineConfig::default()).unwrap();
        let report = runtime.block_on(orchestrator.estimate(
            EstimationRequest::new().with_aerosol(AerosolObservation::new(0.2).with_humidity(70.0)),
            &CancellationToken::new(),
        ));

        let envelope = ReportJson {
            generated_at: timestamp(),
            aqi: report.estimate().map(|e| AqiLevel::from_pm25(e.pm25())),
            report: &report,
        };
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["aqi"], "moderate");
        assert_eq!(json["station"]["status"], "unavailable");
        assert!(json["generated_at"].as_str().unwrap().contains('T'));
    }
}
