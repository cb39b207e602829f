//! Reading and writing the preprocessed SEIFA table.

use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use super::Metric;
use crate::error::{Error, Result};

/// File name of the preprocessed table in the cache directory
pub const PREPROCESSED_FILENAME: &str = "preprocessed_vic_seifa.csv";

/// Area-weighted SEIFA scores for one suburb in one census year.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeifaRecord {
    /// Upper-case suburb name, disambiguated with its LGA where needed
    #[serde(rename = "Site_suburb")]
    pub suburb: String,
    /// Index of Education and Occupation
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ieo_score: Option<f64>,
    /// Index of Economic Resources
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ier_score: Option<f64>,
    /// Index of Relative Socio-economic Advantage and Disadvantage
    #[serde(default, deserialize_with = "lenient_f64")]
    pub irsad_score: Option<f64>,
    /// Rural Index of Relative Socio-economic Advantage
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rirsa_score: Option<f64>,
    /// Urban Index of Relative Socio-economic Advantage
    #[serde(default, deserialize_with = "lenient_f64")]
    pub uirsa_score: Option<f64>,
    /// Index of Relative Socio-economic Disadvantage
    #[serde(default, deserialize_with = "lenient_f64")]
    pub irsd_score: Option<f64>,
    /// Census year
    pub year: i32,
}

impl SeifaRecord {
    /// The score for a metric.
    pub fn score(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Ier => self.ier_score,
            Metric::Irsd => self.irsd_score,
            Metric::Ieo => self.ieo_score,
            Metric::Irsad => self.irsad_score,
            Metric::Rirsa => self.rirsa_score,
            Metric::Uirsa => self.uirsa_score,
        }
    }

    /// Mutable access to the score for a metric.
    pub fn score_mut(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::Ier => &mut self.ier_score,
            Metric::Irsd => &mut self.irsd_score,
            Metric::Ieo => &mut self.ieo_score,
            Metric::Irsad => &mut self.irsad_score,
            Metric::Rirsa => &mut self.rirsa_score,
            Metric::Uirsa => &mut self.uirsa_score,
        }
    }
}

/// Reads a numeric cell, treating blanks, `-` and other text as missing.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite()))
}

/// The preprocessed SEIFA table for Victorian suburbs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeifaDataset {
    records: Vec<SeifaRecord>,
}

impl SeifaDataset {
    /// Wrap records already in memory.
    pub fn from_records(records: Vec<SeifaRecord>) -> Self {
        Self { records }
    }

    /// Read a preprocessed CSV table.
    pub fn load(path: &Path) -> Result<Self> {
        let csv_error = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<SeifaRecord>, _>>()
            .map_err(csv_error)?;
        info!("Loaded {} SEIFA rows from {}", records.len(), path.display());
        Ok(Self { records })
    }

    /// Write the table as CSV, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let csv_error = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        for record in &self.records {
            writer.serialize(record).map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// All rows.
    pub fn records(&self) -> &[SeifaRecord] {
        &self.records
    }

    /// Rows for one suburb (exact, upper-case match).
    pub fn suburb_records<'a>(&'a self, suburb: &'a str) -> impl Iterator<Item = &'a SeifaRecord> {
        self.records.iter().filter(move |record| record.suburb == suburb)
    }

    /// `(year, score)` points for a suburb, skipping missing scores.
    pub fn suburb_points(&self, suburb: &str, metric: Metric) -> Vec<(f64, f64)> {
        self.suburb_records(suburb)
            .filter_map(|record| record.score(metric).map(|score| (f64::from(record.year), score)))
            .collect()
    }
}
