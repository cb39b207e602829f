//! Plots of CPI data.
//!
//! Figures are plotly documents. They are written either as JSON or as a
//! standalone HTML page that loads plotly.js from its CDN.

pub mod figure;

use ausdex_common::{DateInput, Location};
use chrono::{Local, NaiveDate, TimeDelta};
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;
use tracing::info;

pub use figure::{Axis, Figure, Font, Layout, Legend, Line, Title, Trace, Visibility, format_date};

use crate::error::{Error, Result};
use crate::inflation::{Cpi, slice_series};
use crate::settings::Settings;

/// Start of the Reserve Bank's 2 to 3 per cent inflation target
const RBA_TARGET_START: (i32, u32, u32) = (1992, 8, 17);

const GRID_COLOR: &str = "#dddddd";

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{{ title }}</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
</head>
<body>
<div id="figure"></div>
<script>
const figure = {{ figure | safe }};
Plotly.newPlot("figure", figure.data, figure.layout);
</script>
</body>
</html>
"#;

/// Output formats for [`write_fig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureFormat {
    /// Standalone page
    Html,
    /// Plotly JSON
    Json,
}

impl FigureFormat {
    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("html" | "htm") => Ok(FigureFormat::Html),
            Some("json") => Ok(FigureFormat::Json),
            _ => Err(Error::UnsupportedFigureFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Apply the house style: size, fonts, white background and framed axes.
pub fn format_fig(fig: &mut Figure) {
    let layout = &mut fig.layout;
    layout.width = Some(1200);
    layout.height = Some(550);
    layout.plot_bgcolor = Some("white".to_string());
    layout.font = Some(Font {
        family: Some("Linux Libertine Display O".to_string()),
        size: Some(18.0),
        color: Some("black".to_string()),
    });
    layout.title.get_or_insert_with(Title::default).font = Some(Font {
        color: Some("black".to_string()),
        ..Font::default()
    });

    for axis in [&mut layout.xaxis, &mut layout.yaxis] {
        axis.gridcolor = Some(GRID_COLOR.to_string());
        axis.showline = Some(true);
        axis.linewidth = Some(1.0);
        axis.linecolor = Some("black".to_string());
        axis.mirror = Some(true);
        axis.ticks = Some("outside".to_string());
    }
}

/// Render a figure as a standalone HTML page.
pub fn render_html(fig: &Figure) -> Result<String> {
    // Keep the JSON from closing the script element early
    let figure = serde_json::to_string(fig)?.replace("</", "<\\/");
    let mut context = Context::new();
    context.insert("title", fig.title().unwrap_or("ausdex"));
    context.insert("figure", &figure);
    Ok(tera::Tera::one_off(HTML_TEMPLATE, &context, true)?)
}

/// Write a figure as HTML or JSON according to the path's extension.
///
/// Missing parent directories are created.
pub fn write_fig(fig: &Figure, output: &Path) -> Result<()> {
    let format = FigureFormat::from_path(output)?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let contents = match format {
        FigureFormat::Html => render_html(fig)?,
        FigureFormat::Json => serde_json::to_string_pretty(fig)?,
    };
    fs::write(output, contents)?;
    info!("Wrote figure to {}", output.display());
    Ok(())
}

/// Write a figure as HTML under `{cache_dir}/figures` for viewing, returning its path.
pub fn show_fig(fig: &Figure, settings: &Settings) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S%.3f");
    let path = settings
        .cached_path("figures")?
        .join(format!("figure-{stamp}.html"));
    write_fig(fig, &path)?;
    Ok(path)
}

fn resolve_locations(locations: &[Location]) -> Vec<Location> {
    if locations.is_empty() {
        Location::ALL.to_vec()
    } else {
        locations.to_vec()
    }
}

fn title_location(locations: &[Location]) -> Location {
    match locations {
        [single] => *single,
        _ => Location::Australia,
    }
}

/// What `value` dollars at `compare_date` are worth in every quarter.
pub fn plot_inflation_timeseries(
    cpi: &Cpi,
    compare_date: &DateInput,
    start_date: Option<DateInput>,
    end_date: Option<DateInput>,
    value: f64,
    location: Location,
) -> Result<Figure> {
    let series =
        cpi.calc_inflation_timeseries(compare_date.clone(), start_date, end_date, value, location)?;

    let mut trace = Trace::line("Equivalent Dollar Value", &series);
    trace.showlegend = Some(false);

    let mut fig = Figure {
        data: vec![trace],
        layout: Layout {
            xaxis: Axis {
                title: Some(Title::new("Date")),
                ..Axis::default()
            },
            yaxis: Axis {
                title: Some(Title::new("Equivalent Dollar Value")),
                ..Axis::default()
            },
            ..Layout::default()
        },
    };
    fig.set_title(format!("The equivalent of ${value:.2} from {compare_date}"));
    format_fig(&mut fig);
    Ok(fig)
}

/// The CPI of each location over time. No locations means all of them.
pub fn plot_cpi_timeseries(
    cpi: &Cpi,
    start_date: Option<DateInput>,
    end_date: Option<DateInput>,
    locations: &[Location],
    title: Option<&str>,
) -> Result<Figure> {
    let locations = resolve_locations(locations);
    let data = locations
        .iter()
        .map(|location| {
            let series = slice_series(
                cpi.cpi_series(*location)?,
                start_date.as_ref(),
                end_date.as_ref(),
            )?;
            Ok(Trace::line(location.name(), &series))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut fig = Figure {
        data,
        layout: Layout {
            xaxis: Axis {
                title: Some(Title::new("Date")),
                ..Axis::default()
            },
            yaxis: Axis {
                title: Some(Title::new("CPI")),
                ..Axis::default()
            },
            legend: Some(Legend {
                title: Some(Title::new("Location")),
            }),
            ..Layout::default()
        },
    };
    if locations.len() == 1 {
        fig.layout.showlegend = Some(false);
    }
    fig.set_title(match title {
        Some(title) => title.to_string(),
        None => format!(
            "Consumer Price Index in {} over time",
            title_location(&locations)
        ),
    });
    format_fig(&mut fig);
    Ok(fig)
}

/// Percentage change from the same quarter a year earlier.
///
/// Only Australia is shown at first; other locations can be switched on in
/// the legend. The RBA target band is drawn from its introduction in 1992.
pub fn plot_cpi_change(
    cpi: &Cpi,
    start_date: Option<DateInput>,
    end_date: Option<DateInput>,
    locations: &[Location],
    title: Option<&str>,
    rba_target: bool,
) -> Result<Figure> {
    let locations = resolve_locations(locations);
    let mut data = Vec::with_capacity(locations.len() + 1);
    let mut first_date: Option<NaiveDate> = None;
    let mut last_date: Option<NaiveDate> = None;

    for location in &locations {
        let series = slice_series(
            cpi.cpi_change_series(*location)?,
            start_date.as_ref(),
            end_date.as_ref(),
        )?;
        if let (Some((first, _)), Some((last, _))) = (series.first(), series.last()) {
            first_date = Some(first_date.map_or(*first, |date| date.min(*first)));
            last_date = Some(last_date.map_or(*last, |date| date.max(*last)));
        }

        let name = if locations.len() > 1 {
            location.name()
        } else {
            "CPI Change"
        };
        let mut trace = Trace::line(name, &series);
        let is_australia = *location == Location::Australia;
        trace.line = Some(Line {
            width: Some(if is_australia { 4.0 } else { 1.5 }),
            color: None,
        });
        trace.visible = Some(if is_australia {
            Visibility::Visible
        } else {
            Visibility::LegendOnly
        });
        data.push(trace);
    }

    if rba_target
        && let Some(last) = last_date
        && let Some(start) =
            NaiveDate::from_ymd_opt(RBA_TARGET_START.0, RBA_TARGET_START.1, RBA_TARGET_START.2)
    {
        let corners = [
            (start, Some(0.02)),
            (last, Some(0.02)),
            (last, Some(0.03)),
            (start, Some(0.03)),
        ];
        let mut band = Trace::line("RBA Target", &corners);
        band.mode = None;
        band.fill = Some("toself".to_string());
        band.fillcolor = Some("rgba(0,176,246,0.2)".to_string());
        band.line = Some(Line {
            width: None,
            color: Some("rgba(255,255,255,0)".to_string()),
        });
        band.showlegend = Some(true);
        data.push(band);
    }

    let range = match (first_date, last_date) {
        (Some(first), Some(last)) => Some(vec![
            format_date(first),
            format_date(last + TimeDelta::days(200)),
        ]),
        _ => None,
    };

    let mut fig = Figure {
        data,
        layout: Layout {
            xaxis: Axis {
                title: Some(Title::new("Date")),
                range,
                ..Axis::default()
            },
            yaxis: Axis {
                title: Some(Title::new("Percentage Change")),
                tickformat: Some(",.0%".to_string()),
                zeroline: Some(true),
                zerolinewidth: Some(1.0),
                zerolinecolor: Some("Black".to_string()),
                ..Axis::default()
            },
            ..Layout::default()
        },
    };
    fig.set_title(match title {
        Some(title) => title.to_string(),
        None => format!(
            "Percentage change from corresponding quarter of previous year in {}",
            title_location(&locations)
        ),
    });
    format_fig(&mut fig);
    Ok(fig)
}
