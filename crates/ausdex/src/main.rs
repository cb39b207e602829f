//! The `ausdex` command line tool.

fn main() {
    let args: Vec<String> = std::env::args().collect();
    std::process::exit(ausdex_cli::run_cli(args));
}
