use ausdex_common::{DateInput, Location, convert_date};
use ausdex_core::viz::FigureFormat;
use ausdex_core::{Figure, plot_cpi_change, plot_cpi_timeseries, plot_inflation_timeseries};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::common::{downloader, launch_path, load_cpi, run_cli_async};

/// Where a figure goes: the browser, a file, or both.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    #[arg(
        long = "show",
        overrides_with = "no_show",
        help = "Open the figure in a browser (default)"
    )]
    show: bool,
    #[arg(long = "no-show", overrides_with = "show", help = "Do not open the figure")]
    no_show: bool,
    #[arg(
        long = "output",
        value_name = "PATH",
        help = "Write the figure to this path (.html or .json)"
    )]
    pub output: Option<PathBuf>,
}

impl OutputArgs {
    pub fn show(&self) -> bool {
        !self.no_show || self.show
    }

    /// Fail early on an output format that cannot be written.
    fn validate(&self) -> Result<(), String> {
        if let Some(output) = &self.output {
            FigureFormat::from_path(output).map_err(|err| err.to_string())?;
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct DateRangeArgs {
    #[arg(long = "start-date", value_name = "DATE", help = "First date to plot")]
    pub start_date: Option<String>,
    #[arg(long = "end-date", value_name = "DATE", help = "Last date to plot")]
    pub end_date: Option<String>,
}

impl DateRangeArgs {
    fn resolve(&self) -> Result<(Option<DateInput>, Option<DateInput>), String> {
        let check = |date: &Option<String>| -> Result<Option<DateInput>, String> {
            match date {
                Some(text) => {
                    convert_date(text).map_err(|err| err.to_string())?;
                    Ok(Some(DateInput::from(text)))
                }
                None => Ok(None),
            }
        };
        Ok((check(&self.start_date)?, check(&self.end_date)?))
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlotInflationArgs {
    #[arg(
        value_name = "COMPARE_DATE",
        help = "Date of the dollar value to compare against"
    )]
    pub compare_date: String,
    #[command(flatten)]
    pub output: OutputArgs,
    #[command(flatten)]
    pub range: DateRangeArgs,
    #[arg(
        long = "value",
        default_value_t = 1.0,
        allow_negative_numbers = true,
        help = "Value in COMPARE_DATE dollars"
    )]
    pub value: f64,
    #[arg(long = "location", default_value_t = Location::Australia, help = "The CPI location")]
    pub location: Location,
}

#[derive(Args, Debug, Clone)]
pub struct PlotCpiArgs {
    #[command(flatten)]
    pub output: OutputArgs,
    #[command(flatten)]
    pub range: DateRangeArgs,
    #[arg(
        long = "location",
        value_name = "LOCATION",
        help = "Location to plot; repeat for several. Defaults to all"
    )]
    pub location: Vec<Location>,
    #[arg(long = "title", help = "Figure title")]
    pub title: Option<String>,
}

pub async fn run_inflation(args: PlotInflationArgs) -> i32 {
    run_cli_async(|| run_inflation_inner(args)).await
}

async fn run_inflation_inner(args: PlotInflationArgs) -> Result<(), String> {
    args.output.validate()?;
    convert_date(args.compare_date.as_str()).map_err(|err| err.to_string())?;
    let (start, end) = args.range.resolve()?;

    let downloader = downloader()?;
    let cpi = load_cpi(&downloader).await?;
    let fig = plot_inflation_timeseries(
        &cpi,
        &DateInput::from(args.compare_date),
        start,
        end,
        args.value,
        args.location,
    )
    .map_err(|err| err.to_string())?;
    emit(&fig, &args.output, &downloader).await
}

pub async fn run_cpi(args: PlotCpiArgs) -> i32 {
    run_cli_async(|| run_cpi_inner(args, false)).await
}

pub async fn run_cpi_change(args: PlotCpiArgs) -> i32 {
    run_cli_async(|| run_cpi_inner(args, true)).await
}

async fn run_cpi_inner(args: PlotCpiArgs, change: bool) -> Result<(), String> {
    args.output.validate()?;
    let (start, end) = args.range.resolve()?;

    let downloader = downloader()?;
    let cpi = load_cpi(&downloader).await?;
    let title = args.title.as_deref();
    let fig = if change {
        plot_cpi_change(&cpi, start, end, &args.location, title, true)
    } else {
        plot_cpi_timeseries(&cpi, start, end, &args.location, title)
    }
    .map_err(|err| err.to_string())?;
    emit(&fig, &args.output, &downloader).await
}

async fn emit(
    fig: &Figure,
    output: &OutputArgs,
    downloader: &ausdex_core::Downloader,
) -> Result<(), String> {
    if let Some(path) = &output.output {
        write(fig, path)?;
    }
    if output.show() {
        let path =
            ausdex_core::show_fig(fig, downloader.settings()).map_err(|err| err.to_string())?;
        launch_path(&path).await?;
    }
    Ok(())
}

fn write(fig: &Figure, path: &Path) -> Result<(), String> {
    println!("Writing figure to '{}'.", path.display());
    ausdex_core::write_fig(fig, path).map_err(|err| err.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn output(path: Option<&str>) -> OutputArgs {
        OutputArgs {
            show: false,
            no_show: true,
            output: path.map(PathBuf::from),
        }
    }

    #[test]
    fn test_validate_output_extension() {
        assert!(output(None).validate().is_ok());
        assert!(output(Some("figure.html")).validate().is_ok());
        assert!(output(Some("figure.json")).validate().is_ok());
        let err = output(Some("figure.png")).validate().unwrap_err();
        assert!(err.contains("figure.png"));
    }

    #[test]
    fn test_date_range_rejects_bad_dates() {
        let range = DateRangeArgs {
            start_date: Some("1990".to_string()),
            end_date: Some("sometime".to_string()),
        };
        assert!(range.resolve().is_err());

        let range = DateRangeArgs {
            start_date: Some("1990".to_string()),
            end_date: None,
        };
        let (start, end) = range.resolve().unwrap();
        assert_eq!(start, Some(DateInput::from("1990")));
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_unsupported_output_fails_before_download() {
        let args = PlotCpiArgs {
            output: output(Some("figure.pdf")),
            range: DateRangeArgs {
                start_date: None,
                end_date: None,
            },
            location: vec![],
            title: None,
        };
        assert!(run_cpi_inner(args, true).await.is_err());
    }
}
