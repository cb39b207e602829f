//! SEIFA scores for Victorian suburbs.
//!
//! The ABS publishes SEIFA indexes for census areas whose boundaries change
//! between censuses. Scores are aggregated to suburbs once (see
//! [`wrangling`]) and then interpolated linearly between census years.

pub mod data_io;
pub mod interpolate;
pub mod wrangling;

use ausdex_common::{DateInput, decimal_year};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub use data_io::{SeifaDataset, SeifaRecord};
pub use interpolate::{FillValue, Interpolator};
pub use wrangling::{OverlayRecord, aggregate_area_weighted, preprocess_victorian_datasets};

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Victorian suburb names shared by more than one place, qualified by LGA.
pub const DOUBLE_NAMES: [&str; 35] = [
    "ASCOT - BALLARAT",
    "ASCOT - GREATER BENDIGO",
    "ASCOT - HEPBURN",
    "BELLFIELD - BANYULE",
    "BELLFIELD - GRAMPIANS",
    "BIG HILL - GREATER BENDIGO",
    "BIG HILL - SURF COAST",
    "FAIRY DELL - CAMPASPE",
    "FAIRY DELL - EAST GIPPSLAND",
    "FRAMLINGHAM - MOYNE",
    "GOLDEN POINT - BALLARAT",
    "GOLDEN POINT - CENTRAL GOLDFIELDS",
    "GOLDEN POINT - MOUNT ALEXANDER",
    "HAPPY VALLEY - GOLDEN PLAINS",
    "HAPPY VALLEY - SWAN HILL",
    "HILLSIDE - EAST GIPPSLAND",
    "HILLSIDE - MELTON",
    "KILLARA - GLENELG",
    "KILLARA - WODONGA",
    "MERRIJIG - EAST GIPPSLAND",
    "MERRIJIG - MANSFIELD",
    "MERRIJIG - WANGARATTA",
    "MOONLIGHT FLAT - CENTRAL GOLDFIELDS",
    "MOONLIGHT FLAT - MOUNT ALEXANDER",
    "MYALL - BULOKE",
    "MYALL - GANNAWARRA",
    "NEWTOWN - GOLDEN PLAINS",
    "NEWTOWN - GREATER GEELONG",
    "REEDY CREEK - MITCHELL",
    "SPRINGFIELD - MACEDON RANGES",
    "SPRINGFIELD - SWAN HILL",
    "STONY CREEK - HEPBURN",
    "STONY CREEK - SOUTH GIPPSLAND",
    "THOMSON - BAW BAW",
    "THOMSON - GREATER GEELONG",
];

/// A SEIFA index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    /// Index of Economic Resources
    #[serde(rename = "ier_score")]
    Ier,
    /// Index of Relative Socio-economic Disadvantage
    #[serde(rename = "irsd_score")]
    Irsd,
    /// Index of Education and Occupation
    #[serde(rename = "ieo_score")]
    Ieo,
    /// Index of Relative Socio-economic Advantage and Disadvantage
    #[serde(rename = "irsad_score")]
    Irsad,
    /// Rural Index of Relative Socio-economic Advantage
    #[serde(rename = "rirsa_score")]
    Rirsa,
    /// Urban Index of Relative Socio-economic Advantage
    #[serde(rename = "uirsa_score")]
    Uirsa,
}

impl Metric {
    /// Every metric.
    pub const ALL: [Metric; 6] = [
        Metric::Ier,
        Metric::Irsd,
        Metric::Ieo,
        Metric::Irsad,
        Metric::Rirsa,
        Metric::Uirsa,
    ];

    /// Column name, e.g. `irsd_score`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Ier => "ier_score",
            Metric::Irsd => "irsd_score",
            Metric::Ieo => "ieo_score",
            Metric::Irsad => "irsad_score",
            Metric::Rirsa => "rirsa_score",
            Metric::Uirsa => "uirsa_score",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Accepts the column name with or without the `_score` suffix.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let name = name.strip_suffix("_score").unwrap_or(&name);
        Metric::ALL
            .into_iter()
            .find(|metric| metric.as_str().strip_suffix("_score") == Some(name))
            .ok_or_else(|| {
                let options: Vec<_> = Metric::ALL.iter().map(Metric::as_str).collect();
                format!("Unknown SEIFA metric '{s}'. Options are {}", options.join(", "))
            })
    }
}

/// Qualify a suburb with its LGA when the name is ambiguous.
pub fn fix_double_suburbs(suburb: &str, lga: &str) -> String {
    let combined = format!("{suburb} - {lga}");
    if DOUBLE_NAMES.contains(&combined.as_str()) {
        combined
    } else {
        suburb.to_string()
    }
}

fn normalise_suburb(suburb: &str, lga: Option<&str>) -> String {
    let suburb = suburb.trim().to_uppercase();
    match lga {
        Some(lga) => fix_double_suburbs(&suburb, &lga.trim().to_uppercase()),
        None => suburb,
    }
}

/// Interpolated SEIFA result: one value for a single year, otherwise one per year.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolated {
    /// A single year was requested
    Scalar(f64),
    /// Several years were requested
    Vector(Vec<f64>),
}

/// SEIFA scores for Victorian suburbs with memoised interpolators.
#[derive(Debug, Clone, Default)]
pub struct SeifaVic {
    dataset: SeifaDataset,
    interpolators: HashMap<String, Interpolator>,
}

impl SeifaVic {
    /// Load from the cache, rebuilding the preprocessed table if asked or missing.
    pub fn open(settings: &Settings, force_rebuild: bool) -> Result<Self> {
        preprocess_victorian_datasets(settings, force_rebuild).map(Self::from_dataset)
    }

    /// Use a dataset already in memory.
    pub fn from_dataset(dataset: SeifaDataset) -> Self {
        Self {
            dataset,
            interpolators: HashMap::new(),
        }
    }

    /// The underlying table.
    pub fn dataset(&self) -> &SeifaDataset {
        &self.dataset
    }

    /// Interpolator for a suburb (already upper-case and disambiguated), built on first use.
    pub fn get_interpolator(&mut self, suburb: &str, metric: Metric, fill: FillValue) -> &Interpolator {
        let key = format!("{suburb}_{metric}_{fill}");
        let dataset = &self.dataset;
        self.interpolators.entry(key).or_insert_with(|| {
            let interpolator = Interpolator::new(dataset.suburb_points(suburb, metric), fill);
            if interpolator.is_usable() {
                debug!(suburb, %metric, %fill, "built SEIFA interpolator");
            } else {
                warn!("no suburb named {suburb}");
            }
            interpolator
        })
    }

    /// Interpolated scores for one suburb at each year.
    ///
    /// Years may be dates or (decimal) years. The suburb is matched
    /// case-insensitively; with an LGA, ambiguous names are disambiguated.
    pub fn get_seifa_interpolation(
        &mut self,
        years: &[DateInput],
        suburb: &str,
        metric: Metric,
        lga: Option<&str>,
        fill: FillValue,
    ) -> Result<Vec<f64>> {
        let years = to_decimal_years(years)?;
        let suburb = normalise_suburb(suburb, lga);
        Ok(self.get_interpolator(&suburb, metric, fill).evaluate_many(&years))
    }

    /// Interpolated scores for parallel lists of years, suburbs and LGAs.
    pub fn get_seifa_interpolation_batch(
        &mut self,
        years: &[DateInput],
        suburbs: &[String],
        metric: Metric,
        lgas: Option<&[String]>,
        fill: FillValue,
    ) -> Result<Vec<f64>> {
        check_length(years.len(), suburbs.len())?;
        if let Some(lgas) = lgas {
            check_length(years.len(), lgas.len())?;
        }
        let years = to_decimal_years(years)?;
        let suburbs: Vec<String> = suburbs
            .iter()
            .enumerate()
            .map(|(i, suburb)| normalise_suburb(suburb, lgas.map(|lgas| lgas[i].as_str())))
            .collect();

        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, suburb) in suburbs.iter().enumerate() {
            groups.entry(suburb.as_str()).or_default().push(i);
        }

        let mut output = vec![f64::NAN; years.len()];
        for (suburb, indices) in groups {
            let interpolator = self.get_interpolator(suburb, metric, fill);
            for i in indices {
                output[i] = interpolator.evaluate(years[i]);
            }
        }
        Ok(output)
    }
}

/// Interpolated SEIFA score for a Victorian suburb.
///
/// Returns [`Interpolated::Scalar`] for one year and
/// [`Interpolated::Vector`] otherwise.
pub fn interpolate_vic_suburb_seifa(
    seifa: &mut SeifaVic,
    years: &[DateInput],
    suburb: &str,
    metric: Metric,
    lga: Option<&str>,
    fill: FillValue,
) -> Result<Interpolated> {
    let mut values = seifa.get_seifa_interpolation(years, suburb, metric, lga, fill)?;
    if values.len() == 1 {
        Ok(Interpolated::Scalar(values.remove(0)))
    } else {
        Ok(Interpolated::Vector(values))
    }
}

fn to_decimal_years(years: &[DateInput]) -> Result<Vec<f64>> {
    years
        .iter()
        .map(|year| decimal_year(year.clone()).map_err(Error::from))
        .collect()
}

fn check_length(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch { expected, actual })
    }
}
