//! Piecewise linear interpolation over census years.

use std::fmt;
use std::str::FromStr;

/// What an interpolator returns outside the years it has data for.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FillValue {
    /// NaN on both sides
    #[default]
    Null,
    /// Continue the first and last segments
    Extrapolate,
    /// Repeat the first or last data point
    BoundaryValue,
    /// Fixed values below and above the data
    Constant {
        /// Returned before the first year
        below: f64,
        /// Returned after the last year
        above: f64,
    },
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillValue::Null => f.write_str("null"),
            FillValue::Extrapolate => f.write_str("extrapolate"),
            FillValue::BoundaryValue => f.write_str("boundary_value"),
            FillValue::Constant { below, above } => write!(f, "({below}, {above})"),
        }
    }
}

impl FromStr for FillValue {
    type Err = String;

    /// Accepts `null`, `extrapolate`, `boundary_value` (or `boundary-value`),
    /// a single number, or two numbers separated by a comma.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_lowercase();
        match text.as_str() {
            "null" | "nan" => return Ok(FillValue::Null),
            "extrapolate" => return Ok(FillValue::Extrapolate),
            "boundary_value" | "boundary-value" => return Ok(FillValue::BoundaryValue),
            _ => {}
        }

        let numbers = text
            .trim_matches(|c| c == '(' || c == ')')
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                format!(
                    "Unknown fill value '{s}'. Use null, extrapolate, boundary_value or numbers"
                )
            })?;
        match numbers.as_slice() {
            [value] => Ok(FillValue::Constant {
                below: *value,
                above: *value,
            }),
            [below, above] => Ok(FillValue::Constant {
                below: *below,
                above: *above,
            }),
            _ => Err(format!("Expected one or two fill values, got '{s}'")),
        }
    }
}

/// Linear interpolator through `(year, value)` points.
///
/// Built from fewer than two points it returns NaN everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    fill: FillValue,
}

impl Interpolator {
    /// Build from points in any order; non-finite points are dropped.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>, fill: FillValue) -> Self {
        let mut points: Vec<(f64, f64)> = points
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (xs, ys) = points.into_iter().unzip();
        Self { xs, ys, fill }
    }

    /// True when there are enough points to interpolate.
    pub fn is_usable(&self) -> bool {
        self.xs.len() > 1
    }

    /// Value at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        if !self.is_usable() || x.is_nan() {
            return f64::NAN;
        }
        let last = self.xs.len() - 1;
        let (first_x, last_x) = (self.xs[0], self.xs[last]);

        if x < first_x {
            return match self.fill {
                FillValue::Null => f64::NAN,
                FillValue::Extrapolate => self.segment(0, x),
                FillValue::BoundaryValue => self.ys[0],
                FillValue::Constant { below, .. } => below,
            };
        }
        if x > last_x {
            return match self.fill {
                FillValue::Null => f64::NAN,
                FillValue::Extrapolate => self.segment(last - 1, x),
                FillValue::BoundaryValue => self.ys[last],
                FillValue::Constant { above, .. } => above,
            };
        }

        // Index of the segment whose right end is the first x at or past `x`
        let upper = self.xs.partition_point(|&xi| xi < x).clamp(1, last);
        self.segment(upper - 1, x)
    }

    /// Values at each of `xs`.
    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    fn segment(&self, index: usize, x: f64) -> f64 {
        let (x0, x1) = (self.xs[index], self.xs[index + 1]);
        let (y0, y1) = (self.ys[index], self.ys[index + 1]);
        // xs ascend, so this only catches repeated x values
        if x1 <= x0 {
            return y0;
        }
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}
