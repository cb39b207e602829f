use ausdex_common::{DateInput, convert_date};
use ausdex_core::seifa_vic::data_io::PREPROCESSED_FILENAME;
use ausdex_core::seifa_vic::wrangling::{OVERLAY_FILENAME, build_from_overlay};
use ausdex_core::{FillValue, Interpolated, Metric, SeifaVic, Settings, interpolate_vic_suburb_seifa};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;

use crate::common::{format_elapsed_ms, run_cli_async, spinner};

#[derive(Args, Debug, Clone)]
pub struct InterpolateArgs {
    #[arg(value_name = "YEAR", help = "Year (or date) to interpolate at, e.g. 2020 or 2020.5")]
    pub year: String,
    #[arg(value_name = "SUBURB", help = "Victorian suburb, any capitalisation")]
    pub suburb: String,
    #[arg(
        value_name = "METRIC",
        help = "SEIFA index: ier_score, irsd_score, ieo_score, irsad_score, rirsa_score or uirsa_score"
    )]
    pub metric: Metric,
    #[arg(long = "lga", help = "Local government area, to tell apart suburbs sharing a name")]
    pub lga: Option<String>,
    #[arg(
        long = "fill-value",
        default_value = "null",
        help = "Outside the census years: null, extrapolate or boundary_value"
    )]
    pub fill_value: FillValue,
    #[arg(long = "force-rebuild", help = "Rebuild the preprocessed table first")]
    pub force_rebuild: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        long = "overlay",
        value_name = "PATH",
        help = "Overlay table of census areas intersected with suburbs. Defaults to the cached copy"
    )]
    pub overlay: Option<PathBuf>,
}

pub async fn run_interpolate(args: InterpolateArgs) -> i32 {
    run_cli_async(|| async move { interpolate(args) }).await
}

fn interpolate(args: InterpolateArgs) -> Result<(), String> {
    let year = DateInput::from(args.year.as_str());
    convert_date(year.clone()).map_err(|err| err.to_string())?;

    let settings = Settings::load().map_err(|err| err.to_string())?;
    let mut seifa = SeifaVic::open(&settings, args.force_rebuild).map_err(|err| err.to_string())?;
    let result = interpolate_vic_suburb_seifa(
        &mut seifa,
        &[year],
        &args.suburb,
        args.metric,
        args.lga.as_deref(),
        args.fill_value,
    )
    .map_err(|err| err.to_string())?;

    match result {
        Interpolated::Scalar(value) => println!("{}", format_score(value)),
        Interpolated::Vector(values) => {
            for value in values {
                println!("{}", format_score(value));
            }
        }
    }
    Ok(())
}

pub async fn run_build(args: BuildArgs) -> i32 {
    run_cli_async(|| async move { build(args) }).await
}

fn build(args: BuildArgs) -> Result<(), String> {
    let settings = Settings::load().map_err(|err| err.to_string())?;
    let overlay = match args.overlay {
        Some(path) => path,
        None => settings
            .cached_path(OVERLAY_FILENAME)
            .map_err(|err| err.to_string())?,
    };
    if !overlay.exists() {
        return Err(format!("Overlay table not found at {}", overlay.display()));
    }
    let output = settings
        .cached_path(PREPROCESSED_FILENAME)
        .map_err(|err| err.to_string())?;

    let spinner = spinner("Assembling Victorian SEIFA data...");
    let start = Instant::now();
    let result = build_from_overlay(&overlay, &output);
    spinner.finish_and_clear();
    let dataset = result.map_err(|err| err.to_string())?;

    println!(
        "Wrote {} rows to {} ({})",
        dataset.records().len(),
        output.display(),
        format_elapsed_ms(start)
    );
    Ok(())
}

fn format_score(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(1023.456), "1023.46");
        assert_eq!(format_score(f64::NAN), "nan");
    }

    #[test]
    fn test_bad_year_rejected() {
        let args = InterpolateArgs {
            year: "someday".to_string(),
            suburb: "CARLTON".to_string(),
            metric: Metric::Ier,
            lga: None,
            fill_value: FillValue::Null,
            force_rebuild: false,
        };
        assert!(interpolate(args).is_err());
    }
}
