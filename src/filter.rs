// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filter contract and failure policy.
//!
//! Every filter in filtrate is a single pass over one file: take the bytes
//! that git hands over, transform them, and hand the result back. How the
//! transformation happens is hidden behind [`Transform`]. What happens when
//! the transformation fails is decided by the filter's [`FailurePolicy`]:
//!
//! - __Passthrough__ filters swallow the failure, and emit the original input
//!   unchanged. Git stores the file as if no filter was configured. This is
//!   used where failure is an expected degenerate case, e.g., a PDF that
//!   `pdftk` cannot open because it is password protected.
//! - __Fatal__ filters report the failure, and the process exits non-zero so
//!   git refuses the operation. This is used where storing an unconverted
//!   file would silently defeat the purpose of the filter.

use crate::{scratch::ScratchError, tool::ToolError};

use std::ffi::OsString;
use tracing::{debug, warn};

/// Transformation of one file worth of bytes.
pub trait Transform {
    /// Transform input bytes into output bytes.
    ///
    /// # Errors
    ///
    /// - Return [`FilterError`] if transformation cannot be applied.
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Transformation paired with what to do when it fails.
pub trait Filter: Transform {
    /// Failure policy of filter.
    fn policy(&self) -> FailurePolicy;

    /// Filter input according to failure policy.
    ///
    /// # Errors
    ///
    /// - Return [`FilterError`] if transformation fails under
    ///   [`FailurePolicy::Fatal`].
    fn filter(&self, input: Vec<u8>) -> Result<Outcome> {
        self.policy().apply(self, input)
    }
}

/// What to do with a failed transformation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Emit original input unchanged.
    Passthrough,

    /// Report failure to caller.
    #[default]
    Fatal,
}

impl FailurePolicy {
    /// Run transformation over input, and settle its result by policy.
    ///
    /// # Errors
    ///
    /// - Return [`FilterError`] if transformation fails under
    ///   [`FailurePolicy::Fatal`].
    pub fn apply<T>(self, transform: &T, input: Vec<u8>) -> Result<Outcome>
    where
        T: Transform + ?Sized,
    {
        match transform.transform(&input) {
            Ok(output) => {
                debug!("transformed {} bytes into {} bytes", input.len(), output.len());
                Ok(Outcome::Transformed(output))
            }
            Err(error) if self == Self::Passthrough => {
                warn!("passing input through unchanged: {error}");
                Ok(Outcome::Passthrough(input))
            }
            Err(error) => Err(error),
        }
    }
}

/// Final product of one filter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Transformation succeeded.
    Transformed(Vec<u8>),

    /// Transformation failed, original input is emitted instead.
    Passthrough(Vec<u8>),
}

impl Outcome {
    /// Bytes to emit.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Transformed(bytes) | Self::Passthrough(bytes) => bytes,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }
}

/// Filter error types.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// External tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Scratch space could not be managed.
    #[error(transparent)]
    Scratch(#[from] ScratchError),

    /// External tool exited successfully, but complained anyway.
    #[error("command {program:?} reported diagnostics:\n{diagnostics}")]
    Diagnostics {
        program: OsString,
        diagnostics: String,
    },

    /// SQLite dumped nothing but an empty transaction.
    #[error("SQLite returned an empty database")]
    EmptyDump,

    /// SQLite exited successfully without creating a database file.
    #[error("command {program:?} did not output a database file:\n{diagnostics}")]
    MissingOutput {
        program: OsString,
        diagnostics: String,
    },

    /// Archive could not be read or written.
    #[error("failed to repackage zip archive")]
    Archive(#[from] zip::result::ZipError),

    /// Plain I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = FilterError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Upper;

    impl Transform for Upper {
        fn transform(&self, input: &[u8]) -> Result<Vec<u8>> {
            Ok(input.to_ascii_uppercase())
        }
    }

    struct Broken;

    impl Transform for Broken {
        fn transform(&self, _: &[u8]) -> Result<Vec<u8>> {
            Err(FilterError::EmptyDump)
        }
    }

    impl Filter for Broken {
        fn policy(&self) -> FailurePolicy {
            FailurePolicy::Passthrough
        }
    }

    #[test]
    fn apply_success_is_transformed_regardless_of_policy() -> anyhow::Result<()> {
        for policy in [FailurePolicy::Passthrough, FailurePolicy::Fatal] {
            let outcome = policy.apply(&Upper, b"abc".to_vec())?;
            assert_eq!(outcome, Outcome::Transformed(b"ABC".to_vec()));
        }
        Ok(())
    }

    #[test]
    fn apply_passthrough_returns_input_unchanged() -> anyhow::Result<()> {
        let outcome = FailurePolicy::Passthrough.apply(&Broken, b"%PDF-1.4".to_vec())?;
        assert!(outcome.is_passthrough());
        assert_eq!(outcome.into_bytes(), b"%PDF-1.4".to_vec());
        Ok(())
    }

    #[test]
    fn apply_fatal_propagates_error() {
        let result = FailurePolicy::Fatal.apply(&Broken, b"data".to_vec());
        assert!(matches!(result, Err(FilterError::EmptyDump)));
    }

    #[test]
    fn filter_uses_own_policy() -> anyhow::Result<()> {
        let outcome = Broken.filter(b"data".to_vec())?;
        assert_eq!(outcome, Outcome::Passthrough(b"data".to_vec()));
        Ok(())
    }
}
