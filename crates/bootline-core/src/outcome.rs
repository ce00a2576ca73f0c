//! Invocation outcome and the exit status derived from it.

use std::fmt;

/// Final result of one invocation.
#[derive(Debug)]
pub enum Outcome {
    Success,
    /// `error` is always the root cause from the managed chain. `recovered`
    /// records that an error handler ran, whether or not it succeeded.
    Failure {
        error: anyhow::Error,
        recovered: bool,
    },
}

impl Outcome {
    pub fn failure(error: anyhow::Error) -> Self {
        Self::Failure {
            error,
            recovered: false,
        }
    }

    pub fn recovered(error: anyhow::Error) -> Self {
        Self::Failure {
            error,
            recovered: true,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn was_recovered(&self) -> bool {
        matches!(self, Self::Failure { recovered: true, .. })
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Success => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.is_success() {
            ExitStatus::Success
        } else {
            ExitStatus::Failure
        }
    }
}

impl From<anyhow::Result<()>> for Outcome {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(error) => Self::failure(error),
        }
    }
}

/// Process exit status. Only two values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}
