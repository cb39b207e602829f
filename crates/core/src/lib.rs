//! Australian economic indexes.
//!
//! `ausdex-core` downloads and caches ABS spreadsheets, adjusts dollar
//! values for inflation with the consumer price index, interpolates SEIFA
//! scores for Victorian suburbs and builds plotly figures of the CPI.
//!
//! ```no_run
//! # async fn example() -> ausdex_core::Result<()> {
//! use ausdex_core::{Cpi, Downloader, Location, Settings};
//!
//! let downloader = Downloader::new(Settings::load()?)?;
//! let cpi = Cpi::latest(&downloader).await?;
//! let value = cpi.calc_inflation(13.0, "March 1991", Some("June 2010".into()), Location::Australia)?;
//! # Ok(())
//! # }
//! ```

mod common;
pub mod error;
pub mod files;
pub mod inflation;
pub mod seifa_vic;
pub mod settings;
pub mod viz;

pub use ausdex_common::{DateError, DateInput, Location, convert_date, decimal_year};
pub use error::{Error, Result};
pub use files::{CPI_FILE_ID, Downloader, Quarter};
pub use inflation::{Cpi, CpiTable, EvaluationDates, Series, calc_inflation, latest_cpi_df};
pub use seifa_vic::{FillValue, Interpolated, Metric, SeifaVic, interpolate_vic_suburb_seifa};
pub use settings::Settings;
pub use viz::{Figure, plot_cpi_change, plot_cpi_timeseries, plot_inflation_timeseries, show_fig, write_fig};
