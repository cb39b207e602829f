//! Cached downloads of ABS data files.
//!
//! Every file is downloaded once into the cache directory and reused until a
//! download is forced. Quarterly CPI workbooks are located by quarter and
//! year; when the release for the most recent quarter is not out yet the
//! search steps back one quarter at a time.

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use reqwest::StatusCode;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::common::Timer;
use crate::error::{Error, Result};
use crate::settings::Settings;

/// ABS file id of the consumer price index workbook
pub const CPI_FILE_ID: &str = "640101";

/// Days to step back when a quarter's release is unavailable
const QUARTER_STEP_DAYS: i64 = 89;

/// Retry configuration for HTTP requests
const INITIAL_DELAY_MS: u64 = 125;

/// A quarter of the year, named after its closing month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quarter {
    /// January to March
    Mar,
    /// April to June
    Jun,
    /// July to September
    Sep,
    /// October to December
    Dec,
}

impl Quarter {
    /// All quarters in calendar order.
    pub const ALL: [Quarter; 4] = [Quarter::Mar, Quarter::Jun, Quarter::Sep, Quarter::Dec];

    /// Lowercase three-letter name used in ABS URLs and cache filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Mar => "mar",
            Quarter::Jun => "jun",
            Quarter::Sep => "sep",
            Quarter::Dec => "dec",
        }
    }

    /// Capitalised name for messages.
    pub fn title(&self) -> &'static str {
        match self {
            Quarter::Mar => "Mar",
            Quarter::Jun => "Jun",
            Quarter::Sep => "Sep",
            Quarter::Dec => "Dec",
        }
    }

    /// The most recent quarter that has closed by `date`'s month.
    ///
    /// January and February belong to the December quarter of the year before.
    pub fn latest_closed_by(date: NaiveDate) -> (Quarter, i32) {
        let index = (date.month() as i32 - 3).div_euclid(3);
        match index {
            0 => (Quarter::Mar, date.year()),
            1 => (Quarter::Jun, date.year()),
            2 => (Quarter::Sep, date.year()),
            3 => (Quarter::Dec, date.year()),
            _ => (Quarter::Dec, date.year() - 1),
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quarter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let prefix: String = s.trim().to_lowercase().chars().take(3).collect();
        Quarter::ALL
            .into_iter()
            .find(|quarter| quarter.as_str() == prefix)
            .ok_or(Error::Quarter(prefix))
    }
}

/// File extension of an ABS release: `xlsx` from December 2021 on, `xls` before.
pub fn abs_extension(quarter: Quarter, year: i32) -> &'static str {
    if (year == 2021 && quarter == Quarter::Dec) || year > 2021 {
        "xlsx"
    } else {
        "xls"
    }
}

/// Release directory on the ABS site, e.g. `jun-2021` or `jun-quarter-2022`.
pub fn abs_online_dir(quarter: Quarter, year: i32) -> String {
    if (year == 2022 && matches!(quarter, Quarter::Jun | Quarter::Dec)) || year > 2022 {
        format!("{quarter}-quarter-{year}")
    } else {
        format!("{quarter}-{year}")
    }
}

/// URL of an ABS data file for a quarterly release.
pub fn abs_url(base_url: &str, id: &str, quarter: Quarter, year: i32) -> String {
    format!(
        "{}/{}/{id}.{}",
        base_url.trim_end_matches('/'),
        abs_online_dir(quarter, year),
        abs_extension(quarter, year)
    )
}

/// Outcome of a failed attempt, deciding whether another attempt is worthwhile.
#[derive(Debug)]
enum AttemptError<E> {
    Retry(E),
    Abort(E),
}

/// Execute an async operation with exponential backoff retry.
///
/// Delays double from 125ms. Errors marked [`AttemptError::Abort`] end the
/// loop at once. The error of the last attempt is returned.
async fn fetch_with_retry<T, E, F, Fut>(
    operation: F,
    operation_name: &str,
    max_attempts: u32,
) -> std::result::Result<T, E>
where
    E: fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError<E>>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(AttemptError::Abort(e)) => return Err(e),
            Err(AttemptError::Retry(e)) => {
                if attempt >= max_attempts {
                    return Err(e);
                }
                let delay = INITIAL_DELAY_MS * (1 << (attempt - 1).min(10));
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay,
                    operation = operation_name,
                    error = %e,
                    "HTTP request failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}

/// Why a single request produced no body.
#[derive(Debug)]
enum FetchError {
    /// The server answered with an error status
    Status(StatusCode),
    /// No response, or the body could not be read
    Transport(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status(status) => write!(f, "HTTP {status}"),
            FetchError::Transport(message) => f.write_str(message),
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// A failed download with the HTTP status that ended it, if any.
#[derive(Debug)]
struct DownloadFailure {
    reason: String,
    status: Option<u16>,
}

impl DownloadFailure {
    fn local(reason: String) -> Self {
        Self {
            reason,
            status: None,
        }
    }
}

/// True when the server answered that a release is not there, as opposed to
/// being unreachable or failing.
fn is_unreleased(err: &Error) -> bool {
    match err {
        Error::Download {
            status: Some(status),
            ..
        } => (400..500).contains(status) && *status != StatusCode::TOO_MANY_REQUESTS.as_u16(),
        Error::EmptyFile { .. } => true,
        _ => false,
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.len() > 0)
        .unwrap_or(false)
}

/// Downloads files into the ausdex cache.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    settings: Settings,
}

impl Downloader {
    /// Create a downloader with its own HTTP client.
    pub fn new(settings: Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(concat!("ausdex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { client, settings })
    }

    /// Settings in use.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Downloads a file if a local file does not already exist.
    ///
    /// The file is fetched when `local_path` is missing or empty, or when
    /// `force` is set. It is written to a temporary sibling first and renamed
    /// into place.
    pub async fn cached_download(&self, url: &str, local_path: &Path, force: bool) -> Result<()> {
        if force || !is_non_empty_file(local_path) {
            let timer = Timer::start(format!("download {url}"));
            info!("Downloading {} to {}", url, local_path.display());
            self.download(url, local_path)
                .await
                .map_err(|failure| Error::Download {
                    url: url.to_string(),
                    reason: failure.reason,
                    status: failure.status,
                })?;
            timer.finish();
        } else {
            debug!("Using cached file {}", local_path.display());
        }

        if !is_non_empty_file(local_path) {
            return Err(Error::EmptyFile {
                path: local_path.to_path_buf(),
            });
        }
        Ok(())
    }

    async fn download(
        &self,
        url: &str,
        local_path: &Path,
    ) -> std::result::Result<(), DownloadFailure> {
        let client = &self.client;
        let max_attempts = self.settings.download_retries;
        let bytes = fetch_with_retry(
            || async move {
                let response = client.get(url).send().await.map_err(|e| {
                    AttemptError::Retry(FetchError::Transport(format!("request failed: {e}")))
                })?;
                let status = response.status();
                if is_retryable(status) {
                    return Err(AttemptError::Retry(FetchError::Status(status)));
                }
                if !status.is_success() {
                    return Err(AttemptError::Abort(FetchError::Status(status)));
                }
                response.bytes().await.map_err(|e| {
                    AttemptError::Retry(FetchError::Transport(format!(
                        "failed to read response: {e}"
                    )))
                })
            },
            &format!("download {url}"),
            max_attempts,
        )
        .await
        .map_err(|err| match err {
            FetchError::Status(status) if !is_retryable(status) => DownloadFailure {
                reason: err.to_string(),
                status: Some(status.as_u16()),
            },
            FetchError::Status(status) => DownloadFailure {
                reason: format!("{err} (after {max_attempts} attempts)"),
                status: Some(status.as_u16()),
            },
            FetchError::Transport(_) => DownloadFailure {
                reason: format!("{err} (after {max_attempts} attempts)"),
                status: None,
            },
        })?;

        if let Some(parent) = local_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                DownloadFailure::local(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        // Write to temporary file first
        let mut temp_name = local_path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        temp_name.push(".part");
        let temp_path = local_path.with_file_name(temp_name);
        fs::write(&temp_path, &bytes).map_err(|e| {
            DownloadFailure::local(format!("Failed to write {}: {e}", temp_path.display()))
        })?;

        // Atomic rename
        fs::rename(&temp_path, local_path).map_err(|e| {
            DownloadFailure::local(format!(
                "Failed to move download into {}: {e}",
                local_path.display()
            ))
        })
    }

    /// Downloads a file from the ABS if a local file does not already exist.
    ///
    /// Without `local_path` the file goes to `{id}-{quarter}-{year}.{ext}` in
    /// the cache directory.
    pub async fn cached_download_abs(
        &self,
        id: &str,
        quarter: Quarter,
        year: i32,
        local_path: Option<&Path>,
        force: bool,
    ) -> Result<PathBuf> {
        let extension = abs_extension(quarter, year);
        let local_path = match local_path {
            Some(path) => path.to_path_buf(),
            None => self
                .settings
                .cached_path(&format!("{id}-{quarter}-{year}.{extension}"))?,
        };
        let url = abs_url(&self.settings.abs_base_url, id, quarter, year);
        self.cached_download(&url, &local_path, force).await?;
        Ok(local_path)
    }

    /// Gets an Excel file from the ABS for a quarterly release.
    ///
    /// The extension follows the ABS switch from `xls` to `xlsx` in December 2021.
    pub async fn cached_download_abs_excel(
        &self,
        id: &str,
        quarter: Quarter,
        year: i32,
        local_path: Option<&Path>,
        force: bool,
    ) -> Result<PathBuf> {
        self.cached_download_abs(id, quarter, year, local_path, force)
            .await
    }

    /// Gets the latest ABS release of a data file published before a date.
    ///
    /// Starts at the quarter that closed most recently before `date` (today
    /// when `None`) and steps back until a release downloads, stopping at 1948.
    /// Only a release the server reports missing, or an empty file, moves the
    /// search back a quarter; any other download failure is returned as is.
    pub async fn cached_download_abs_excel_by_date(
        &self,
        id: &str,
        date: Option<NaiveDate>,
        local_path: Option<&Path>,
        force: bool,
    ) -> Result<PathBuf> {
        let start = date.unwrap_or_else(|| Local::now().date_naive());
        let earliest = NaiveDate::from_ymd_opt(1948, 1, 1)
            .ok_or_else(|| Error::Config("invalid earliest CPI date".to_string()))?;

        let mut date = start;
        while date > earliest {
            let (quarter, year) = Quarter::latest_closed_by(date);
            match self
                .cached_download_abs_excel(id, quarter, year, local_path, force)
                .await
            {
                Ok(path) => return Ok(path),
                Err(err) if is_unreleased(&err) => {
                    debug!(error = %err, "ABS release unavailable");
                    warn!(
                        "CPI data for Quarter {} {} not yet available.",
                        quarter.title(),
                        year
                    );
                }
                Err(err) => return Err(err),
            }
            date = match date.checked_sub_signed(TimeDelta::days(QUARTER_STEP_DAYS)) {
                Some(previous) => previous,
                None => break,
            };
        }

        Err(Error::NoData {
            id: id.to_string(),
            date: start,
        })
    }

    /// Path to the latest cached CPI workbook (ABS file `640101`), downloading it if needed.
    pub async fn cached_download_cpi(
        &self,
        date: Option<NaiveDate>,
        local_path: Option<&Path>,
        force: bool,
    ) -> Result<PathBuf> {
        self.cached_download_abs_excel_by_date(CPI_FILE_ID, date, local_path, force)
            .await
    }
}
