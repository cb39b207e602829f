use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use tokio::process::Command;

use crate::common::{format_elapsed_ms, launch, launch_path, run_cli_async, run_command_streaming, spinner};

/// Hosted documentation
pub const DOCS_URL: &str = "https://rbturnbull.github.io/ausdex/";

#[derive(Args, Debug, Clone)]
pub struct DocsArgs {
    #[arg(
        long = "live",
        overrides_with = "no_live",
        help = "Open the hosted documentation (default)"
    )]
    live: bool,
    #[arg(
        long = "no-live",
        overrides_with = "live",
        help = "Build the API documentation locally with cargo doc and open it"
    )]
    no_live: bool,
}

impl DocsArgs {
    fn live(&self) -> bool {
        !self.no_live || self.live
    }
}

pub async fn run(args: DocsArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: DocsArgs) -> Result<(), String> {
    if args.live() {
        println!("Opening {DOCS_URL}");
        return launch(DOCS_URL).await;
    }

    let spinner = spinner("Building documentation...");
    let start = Instant::now();
    let mut cmd = Command::new("cargo");
    cmd.args(["doc", "--no-deps"]);
    let result = run_command_streaming(cmd, &spinner, "Failed to build documentation").await;
    spinner.finish_and_clear();
    result?;

    let index = local_index();
    if !index.exists() {
        return Err(format!("Documentation index not found at {}", index.display()));
    }
    println!("Built documentation ({})", format_elapsed_ms(start));
    launch_path(&index).await
}

/// Entry page written by `cargo doc`.
fn local_index() -> PathBuf {
    let target_dir = std::env::var_os("CARGO_TARGET_DIR")
        .map_or_else(|| PathBuf::from("target"), PathBuf::from);
    target_dir.join("doc").join("ausdex_core").join("index.html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_by_default() {
        let args = DocsArgs {
            live: false,
            no_live: false,
        };
        assert!(args.live());
        let args = DocsArgs {
            live: false,
            no_live: true,
        };
        assert!(!args.live());
    }

    #[test]
    fn test_local_index_location() {
        assert!(local_index().ends_with("doc/ausdex_core/index.html"));
    }
}
