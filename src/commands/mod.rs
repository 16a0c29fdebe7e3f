//! Subcommand implementations.

pub mod chapters;
pub mod convert;
pub mod exec;
pub mod metadata;
pub mod probe;

use anyhow::Result;
use mediaforged_av::RunOutcome;

/// A run was stopped by a cancellation request. The binary maps this to
/// exit status 130.
#[derive(Debug, thiserror::Error)]
#[error("{tool} was cancelled")]
pub struct Cancelled {
    pub tool: String,
}

/// Turn a child outcome into a command result.
pub fn check_outcome(tool: &str, outcome: RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::Completed(0) => Ok(()),
        RunOutcome::Completed(code) => anyhow::bail!("{} failed with exit code {}", tool, code),
        RunOutcome::Cancelled => Err(Cancelled {
            tool: tool.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_outcome() {
        assert!(check_outcome("ffmpeg", RunOutcome::Completed(0)).is_ok());

        let err = check_outcome("ffmpeg", RunOutcome::Completed(1)).unwrap_err();
        assert_eq!(err.to_string(), "ffmpeg failed with exit code 1");
        assert!(!err.is::<Cancelled>());

        let err = check_outcome("ffmpeg", RunOutcome::Cancelled).unwrap_err();
        assert!(err.is::<Cancelled>());
    }
}
