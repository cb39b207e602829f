//! Aggregating census-area scores up to suburbs.
//!
//! The input is an overlay table: census areas already intersected with
//! suburb boundaries, one row per fragment with its area. Every suburb's
//! score for a census year is the area-weighted mean of its fragments.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use super::Metric;
use super::data_io::{PREPROCESSED_FILENAME, SeifaDataset, SeifaRecord, lenient_f64};
use crate::error::{Error, Result};
use crate::settings::Settings;

/// File name of the overlay table in the cache directory
pub const OVERLAY_FILENAME: &str = "vic_seifa_overlay.csv";

/// One fragment of a census area lying inside a suburb.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OverlayRecord {
    /// Suburb the fragment lies in
    #[serde(rename = "Site_suburb")]
    pub suburb: String,
    /// Census year of the scores
    pub year: i32,
    /// Fragment area in square metres; missing counts as zero
    #[serde(default, deserialize_with = "lenient_f64")]
    pub area: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    ieo_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    ier_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    irsad_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    rirsa_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    uirsa_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    irsd_score: Option<f64>,
}

impl OverlayRecord {
    /// A fragment with no scores yet.
    pub fn new(suburb: impl Into<String>, year: i32, area: Option<f64>) -> Self {
        Self {
            suburb: suburb.into(),
            year,
            area,
            ..Self::default()
        }
    }

    /// Set one score.
    pub fn with_score(mut self, metric: Metric, value: f64) -> Self {
        *self.score_mut(metric) = Some(value);
        self
    }

    /// The census area's score for a metric.
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

    fn score_mut(&mut self, metric: Metric) -> &mut Option<f64> {
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

/// Read an overlay table from CSV.
pub fn read_overlay(path: &Path) -> Result<Vec<OverlayRecord>> {
    let csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<OverlayRecord>, _>>()
        .map_err(csv_error)
}

#[derive(Debug, Default)]
struct WeightedSum {
    total: f64,
    seen: bool,
}

/// Area-weighted mean of each score per suburb and year.
///
/// Each score is `Σ(value × area) / Σ(area)`. Fragments missing a value add
/// nothing to the numerator but keep their area in the denominator. A score
/// with no values at all, or a group with zero area, stays missing. Rows
/// come out ordered by year, then suburb.
pub fn aggregate_area_weighted(records: &[OverlayRecord]) -> Vec<SeifaRecord> {
    let mut groups: BTreeMap<(i32, &str), (f64, BTreeMap<Metric, WeightedSum>)> = BTreeMap::new();
    for record in records {
        let area = record.area.unwrap_or(0.0);
        let (total_area, sums) = groups
            .entry((record.year, record.suburb.as_str()))
            .or_default();
        *total_area += area;
        for metric in Metric::ALL {
            if let Some(value) = record.score(metric) {
                let sum = sums.entry(metric).or_default();
                sum.total += value * area;
                sum.seen = true;
            }
        }
    }

    groups
        .into_iter()
        .map(|((year, suburb), (total_area, sums))| {
            let mut row = SeifaRecord {
                suburb: suburb.to_string(),
                year,
                ..SeifaRecord::default()
            };
            if total_area > 0.0 {
                for (metric, sum) in sums {
                    if sum.seen {
                        *row.score_mut(metric) = Some(sum.total / total_area);
                    }
                }
            }
            row
        })
        .collect()
}

/// Build the preprocessed table from an overlay table and save it.
pub fn build_from_overlay(overlay: &Path, output: &Path) -> Result<SeifaDataset> {
    info!("Assembling Victorian SEIFA data from {}", overlay.display());
    let records = read_overlay(overlay)?;
    let rows = aggregate_area_weighted(&records);
    if rows.is_empty() {
        warn!("Overlay table {} has no rows", overlay.display());
    }
    let dataset = SeifaDataset::from_records(rows);
    dataset.save(output)?;
    info!(
        "Wrote {} suburb-year rows to {}",
        dataset.records().len(),
        output.display()
    );
    Ok(dataset)
}

/// Load the preprocessed table from the cache, building it when needed.
///
/// The table is rebuilt from the cached overlay table when it is missing or
/// `force_rebuild` is set.
pub fn preprocess_victorian_datasets(settings: &Settings, force_rebuild: bool) -> Result<SeifaDataset> {
    let preprocessed = settings.cached_path(PREPROCESSED_FILENAME)?;
    if preprocessed.exists() && !force_rebuild {
        return SeifaDataset::load(&preprocessed);
    }

    let overlay = settings.cached_path(OVERLAY_FILENAME)?;
    if !overlay.exists() {
        return Err(Error::DatasetMissing {
            dataset: preprocessed,
            overlay,
        });
    }
    build_from_overlay(&overlay, &preprocessed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|actual| (actual - expected).abs() < 1e-9)
    }

    #[test]
    fn test_weighted_average() {
        let records = vec![
            OverlayRecord::new("CARLTON", 2016, Some(1.0)).with_score(Metric::Ier, 1000.0),
            OverlayRecord::new("CARLTON", 2016, Some(3.0)).with_score(Metric::Ier, 1100.0),
        ];
        let rows = aggregate_area_weighted(&records);
        assert_eq!(rows.len(), 1);
        assert!(close(rows[0].ier_score, 1075.0));
        assert_eq!(rows[0].irsd_score, None);
    }

    #[test]
    fn test_missing_values_keep_their_area() {
        let records = vec![
            OverlayRecord::new("CARLTON", 2016, Some(1.0)).with_score(Metric::Ier, 1000.0),
            OverlayRecord::new("CARLTON", 2016, Some(1.0)),
        ];
        let rows = aggregate_area_weighted(&records);
        assert!(close(rows[0].ier_score, 500.0));
    }

    #[test]
    fn test_missing_area_counts_as_zero() {
        let records = vec![
            OverlayRecord::new("CARLTON", 2016, None).with_score(Metric::Ier, 5000.0),
            OverlayRecord::new("CARLTON", 2016, Some(2.0)).with_score(Metric::Ier, 1000.0),
        ];
        let rows = aggregate_area_weighted(&records);
        assert!(close(rows[0].ier_score, 1000.0));

        let rows = aggregate_area_weighted(&[
            OverlayRecord::new("PARKVILLE", 2016, None).with_score(Metric::Ier, 5000.0)
        ]);
        assert_eq!(rows[0].ier_score, None);
    }

    #[test]
    fn test_rows_ordered_by_year_then_suburb() {
        let records = vec![
            OverlayRecord::new("PARKVILLE", 2016, Some(1.0)).with_score(Metric::Ieo, 1.0),
            OverlayRecord::new("CARLTON", 2016, Some(1.0)).with_score(Metric::Ieo, 1.0),
            OverlayRecord::new("PARKVILLE", 1986, Some(1.0)).with_score(Metric::Ieo, 1.0),
        ];
        let keys: Vec<_> = aggregate_area_weighted(&records)
            .into_iter()
            .map(|row| (row.year, row.suburb))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1986, "PARKVILLE".to_string()),
                (2016, "CARLTON".to_string()),
                (2016, "PARKVILLE".to_string())
            ]
        );
    }

    #[test]
    fn test_preprocess_builds_from_overlay() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::with_cache_dir(temp_dir.path());
        fs::write(
            temp_dir.path().join(OVERLAY_FILENAME),
            "Site_suburb,year,area,ier_score,irsd_score\n\
             CARLTON,2011,2.0,1000,900\n\
             CARLTON,2011,2.0,1100,-\n\
             CARLTON,2016,1.0,1200,950\n",
        )
        .unwrap();

        let dataset = preprocess_victorian_datasets(&settings, false).unwrap();
        assert_eq!(dataset.records().len(), 2);
        assert!(close(dataset.records()[0].ier_score, 1050.0));
        assert!(close(dataset.records()[0].irsd_score, 450.0));
        assert!(temp_dir.path().join(PREPROCESSED_FILENAME).exists());

        // A second load reads the saved table even without the overlay
        fs::remove_file(temp_dir.path().join(OVERLAY_FILENAME)).unwrap();
        let reloaded = preprocess_victorian_datasets(&settings, false).unwrap();
        assert_eq!(reloaded, dataset);
    }

    #[test]
    fn test_preprocess_without_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::with_cache_dir(temp_dir.path());
        let err = preprocess_victorian_datasets(&settings, true).unwrap_err();
        assert!(matches!(err, Error::DatasetMissing { .. }));
    }
}
