use ausdex_common::{DateInput, Location, convert_date};
use clap::Args;

use crate::common::{downloader, load_cpi, run_cli_async};

#[derive(Args, Debug, Clone)]
pub struct InflationArgs {
    #[arg(value_name = "VALUE", allow_negative_numbers = true, help = "The value to be converted")]
    pub value: f64,
    #[arg(
        value_name = "ORIGINAL_DATE",
        help = "The date that the value is in relation to, e.g. 'March 1991' or 2006"
    )]
    pub original_date: String,
    #[arg(
        long = "evaluation-date",
        value_name = "DATE",
        help = "The date to adjust the value to. Defaults to today"
    )]
    pub evaluation_date: Option<String>,
    #[arg(
        long = "location",
        default_value_t = Location::Australia,
        help = "The CPI location: Australia or a capital city"
    )]
    pub location: Location,
}

pub async fn run(args: InflationArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: InflationArgs) -> Result<(), String> {
    // Reject bad dates before touching the network
    convert_date(args.original_date.as_str()).map_err(|err| err.to_string())?;
    if let Some(date) = &args.evaluation_date {
        convert_date(date).map_err(|err| err.to_string())?;
    }

    let downloader = downloader()?;
    let cpi = load_cpi(&downloader).await?;
    let value = cpi
        .calc_inflation(
            args.value,
            args.original_date.as_str(),
            args.evaluation_date.map(DateInput::from),
            args.location,
        )
        .map_err(|err| err.to_string())?;

    println!("{}", format_value(value));
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{value:.2}"),
        _ => "nan".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(21.1443)), "21.14");
        assert_eq!(format_value(Some(-13.0)), "-13.00");
        assert_eq!(format_value(None), "nan");
    }

    #[tokio::test]
    async fn test_bad_date_fails_before_download() {
        let args = InflationArgs {
            value: 1.0,
            original_date: "the day after never".to_string(),
            evaluation_date: None,
            location: Location::Australia,
        };
        let err = run_inner(args).await.unwrap_err();
        assert!(err.contains("the day after never"));
    }
}
