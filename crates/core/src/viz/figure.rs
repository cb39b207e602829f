//! A plotly figure description.
//!
//! Only the attributes ausdex sets are modelled. Unset attributes are left
//! out of the JSON so plotly applies its own defaults.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_with::skip_serializing_none;

/// Whether a trace is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Drawn and listed in the legend
    Visible,
    /// Hidden until clicked in the legend
    LegendOnly,
}

impl Serialize for Visibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Visibility::Visible => serializer.serialize_bool(true),
            Visibility::LegendOnly => serializer.serialize_str("legendonly"),
        }
    }
}

/// Text with an optional font.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Title {
    /// Title text
    pub text: Option<String>,
    /// Font of the text
    pub font: Option<Font>,
}

impl Title {
    /// A title with default styling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            font: None,
        }
    }
}

/// Font settings for titles and labels.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Font {
    /// CSS font family list
    pub family: Option<String>,
    /// Size in points
    pub size: Option<f64>,
    /// CSS colour
    pub color: Option<String>,
}

/// Stroke of a trace.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Line {
    /// Width in pixels
    pub width: Option<f64>,
    /// CSS colour
    pub color: Option<String>,
}

/// One series of points.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Plotly trace type, always `scatter` here
    #[serde(rename = "type")]
    pub trace_type: String,
    /// Drawing mode such as `lines`
    pub mode: Option<String>,
    /// Legend entry
    pub name: Option<String>,
    /// Dates as `YYYY-MM-DD`
    pub x: Vec<String>,
    /// `null` where a value is missing
    pub y: Vec<Option<f64>>,
    /// Stroke style
    pub line: Option<Line>,
    /// Drawn or legend-only
    pub visible: Option<Visibility>,
    /// Area fill mode, e.g. `toself` for a shaded band
    pub fill: Option<String>,
    /// Colour of the filled area
    pub fillcolor: Option<String>,
    /// Whether the trace gets a legend entry
    pub showlegend: Option<bool>,
}

impl Trace {
    /// A line trace through dated points.
    pub fn line(name: impl Into<String>, points: &[(NaiveDate, Option<f64>)]) -> Self {
        Self {
            trace_type: "scatter".to_string(),
            mode: Some("lines".to_string()),
            name: Some(name.into()),
            x: points.iter().map(|(date, _)| format_date(*date)).collect(),
            y: points.iter().map(|(_, value)| *value).collect(),
            line: None,
            visible: None,
            fill: None,
            fillcolor: None,
            showlegend: None,
        }
    }
}

/// An x or y axis.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    /// Axis label
    pub title: Option<Title>,
    /// Colour of the grid lines
    pub gridcolor: Option<String>,
    /// Draw the axis line
    pub showline: Option<bool>,
    /// Width of the axis line in pixels
    pub linewidth: Option<f64>,
    /// Colour of the axis line
    pub linecolor: Option<String>,
    /// Repeat the axis line on the opposite side
    pub mirror: Option<bool>,
    /// Tick placement: `outside`, `inside` or empty
    pub ticks: Option<String>,
    /// d3 format of tick labels, e.g. `%Y` or `.0%`
    pub tickformat: Option<String>,
    /// Lower and upper bound of the visible range
    pub range: Option<Vec<String>>,
    /// Draw a line at zero
    pub zeroline: Option<bool>,
    /// Width of the zero line in pixels
    pub zerolinewidth: Option<f64>,
    /// Colour of the zero line
    pub zerolinecolor: Option<String>,
}

/// Legend box.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Legend {
    /// Heading above the entries
    pub title: Option<Title>,
}

/// Figure-wide presentation.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    /// Figure title
    pub title: Option<Title>,
    /// Width in pixels
    pub width: Option<u32>,
    /// Height in pixels
    pub height: Option<u32>,
    /// Background colour of the plotting area
    pub plot_bgcolor: Option<String>,
    /// Default font for all text
    pub font: Option<Font>,
    /// Horizontal axis
    pub xaxis: Axis,
    /// Vertical axis
    pub yaxis: Axis,
    /// Whether a legend is drawn
    pub showlegend: Option<bool>,
    /// Legend styling
    pub legend: Option<Legend>,
}

/// Traces and layout, serialised in plotly's JSON schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Figure {
    /// Traces in drawing order
    pub data: Vec<Trace>,
    /// Presentation of the whole figure
    pub layout: Layout,
}

impl Figure {
    /// Title text, if any.
    pub fn title(&self) -> Option<&str> {
        self.layout.title.as_ref().and_then(|title| title.text.as_deref())
    }

    /// Set the title text, keeping any title font.
    pub fn set_title(&mut self, text: impl Into<String>) {
        self.layout.title.get_or_insert_with(Title::default).text = Some(text.into());
    }
}

/// Dates on plotly axes
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_attributes_are_omitted() {
        let date = NaiveDate::from_ymd_opt(1948, 9, 1).unwrap();
        let trace = Trace::line("Australia", &[(date, Some(3.7)), (date, None)]);
        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "scatter",
                "mode": "lines",
                "name": "Australia",
                "x": ["1948-09-01", "1948-09-01"],
                "y": [3.7, null]
            })
        );
    }

    #[test]
    fn test_visibility() {
        assert_eq!(serde_json::to_value(Visibility::Visible).unwrap(), json!(true));
        assert_eq!(
            serde_json::to_value(Visibility::LegendOnly).unwrap(),
            json!("legendonly")
        );
    }

    #[test]
    fn test_set_title_keeps_font() {
        let mut figure = Figure::default();
        figure.layout.title = Some(Title {
            text: None,
            font: Some(Font {
                color: Some("black".to_string()),
                ..Font::default()
            }),
        });
        figure.set_title("CPI");
        assert_eq!(figure.title(), Some("CPI"));
        assert!(figure.layout.title.unwrap().font.is_some());
    }
}
