//! Environment-variable configuration, following the same precedence the
//! rest of the fleet uses: an explicit env var first, a sensible hardcoded
//! fallback second. No platform-data-directory lookup (no `dirs` dependency
//! in this workspace) — see DESIGN.md for that deliberate simplification.

use std::path::PathBuf;

pub fn output_directory(cli_value: Option<PathBuf>) -> PathBuf {
    cli_value
        .or_else(|| std::env::var("DOCTIDE_OUTPUT_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./docs"))
}

pub fn user_agent() -> String {
    std::env::var("DOCTIDE_USER_AGENT")
        .unwrap_or_else(|_| format!("doctide/{}", env!("CARGO_PKG_VERSION")))
}

pub fn log_filter(verbose: bool) -> String {
    if let Ok(explicit) = std::env::var("RUST_LOG") {
        return explicit;
    }
    if verbose {
        "debug".to_string()
    } else {
        "info".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_value_wins_over_env_and_default() {
        std::env::set_var("DOCTIDE_OUTPUT_DIR", "/tmp/from-env");
        assert_eq!(output_directory(Some(PathBuf::from("/tmp/from-cli"))), PathBuf::from("/tmp/from-cli"));
        std::env::remove_var("DOCTIDE_OUTPUT_DIR");
    }

    #[test]
    fn env_wins_over_default() {
        std::env::remove_var("DOCTIDE_OUTPUT_DIR");
        assert_eq!(output_directory(None), PathBuf::from("./docs"));

        std::env::set_var("DOCTIDE_OUTPUT_DIR", "/tmp/from-env-only");
        assert_eq!(output_directory(None), PathBuf::from("/tmp/from-env-only"));
        std::env::remove_var("DOCTIDE_OUTPUT_DIR");
    }

    #[test]
    fn verbose_raises_default_filter() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter(false), "info");
        assert_eq!(log_filter(true), "debug");
    }
}
