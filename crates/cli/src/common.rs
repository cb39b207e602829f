//! Helpers shared by the command handlers.

use ausdex_core::{Cpi, Downloader, Settings};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Run a handler and turn its result into an exit code, printing any error.
pub async fn run_cli_async<F, Fut>(f: F) -> i32
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    match f().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}

pub fn format_elapsed_ms(start: Instant) -> String {
    let elapsed = start.elapsed();
    if elapsed.as_secs() == 0 {
        return format!("{}ms", elapsed.as_millis());
    }
    format!("{}s {}ms", elapsed.as_secs(), elapsed.subsec_millis())
}

/// Settings and a downloader for this invocation.
pub fn downloader() -> Result<Downloader, String> {
    let settings = Settings::load().map_err(|err| err.to_string())?;
    debug!(cache_dir = %settings.cache_dir.display(), "loaded settings");
    Downloader::new(settings).map_err(|err| err.to_string())
}

/// Load the latest CPI release behind a spinner.
pub async fn load_cpi(downloader: &Downloader) -> Result<Cpi, String> {
    let spinner = spinner("Loading CPI data from the ABS...");
    let start = Instant::now();
    let result = Cpi::latest(downloader).await;
    spinner.finish_and_clear();
    let cpi = result.map_err(|err| err.to_string())?;
    debug!(
        quarters = cpi.table().len(),
        "CPI data ready in {}",
        format_elapsed_ms(start)
    );
    Ok(cpi)
}

/// Run a command, showing its latest output line on the spinner.
///
/// On failure the error includes the command's stderr.
pub async fn run_command_streaming(
    mut cmd: Command,
    spinner: &ProgressBar,
    error_msg: &str,
) -> Result<(), String> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|err| format!("{error_msg}: {err}"))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_spinner = spinner.clone();
    let stderr_spinner = spinner.clone();

    let stdout_task = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    stdout_spinner.set_message(line.trim().to_string());
                }
            }
        }
    });
    // cargo reports progress on stderr
    let stderr_task = tokio::spawn(async move {
        let mut captured = Vec::new();
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    stderr_spinner.set_message(line.trim().to_string());
                }
                captured.push(line);
            }
        }
        captured.join("\n")
    });

    let (_, stderr_result) = tokio::join!(stdout_task, stderr_task);
    let captured = stderr_result.unwrap_or_default();

    let status = child
        .wait()
        .await
        .map_err(|err| format!("{error_msg}: {err}"))?;
    if !status.success() {
        let mut message = format!("{error_msg}: exit code {}", status.code().unwrap_or(-1));
        if !captured.is_empty() {
            message.push_str(&format!("\n\nStderr:\n{captured}"));
        }
        return Err(message);
    }
    Ok(())
}

/// Open a URL or file in the default browser.
pub async fn launch(target: &str) -> Result<(), String> {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    debug!(target, "opening in browser");
    let status = cmd
        .status()
        .await
        .map_err(|err| format!("Failed to open {target}: {err}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("Failed to open {target}: exit code {}", status.code().unwrap_or(-1)))
    }
}

/// Open a local file in the default browser.
pub async fn launch_path(path: &Path) -> Result<(), String> {
    launch(&path.display().to_string()).await
}
