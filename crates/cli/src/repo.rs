use crate::common::{launch, run_cli_async};

/// Source code repository
pub const REPOSITORY_URL: &str = env!("CARGO_PKG_REPOSITORY");

pub async fn run() -> i32 {
    run_cli_async(|| async {
        println!("Opening {REPOSITORY_URL}");
        launch(REPOSITORY_URL).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_url() {
        assert_eq!(REPOSITORY_URL, "https://github.com/rbturnbull/ausdex");
    }
}
