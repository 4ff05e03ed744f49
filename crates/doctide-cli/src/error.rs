//! Exit-code mapping for the CLI. The business logic lives in
//! `doctide-strategies`; this module only translates its error taxonomy
//! into POSIX-style process exit codes.

use doctide_types::DocError;

/// Exit codes, following POSIX conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Fatal error: URL parse failure, filter-subpath missing, cancellation,
    /// acquisition failure, or any other unrecoverable condition.
    FatalError = 1,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Every fatal path the dispatcher can return maps to the same exit code;
/// the message printed to the user still distinguishes the cause.
pub fn exit_code_for(_error: &DocError) -> ExitCode {
    ExitCode::FatalError
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_variant_maps_to_fatal() {
        assert_eq!(exit_code_for(&DocError::Canceled), ExitCode::FatalError);
        assert_eq!(
            exit_code_for(&DocError::UrlParse("x".to_string())),
            ExitCode::FatalError
        );
    }
}
