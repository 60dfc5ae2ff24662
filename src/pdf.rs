// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! PDF decompression filter.
//!
//! Rewrites PDF files with all of their streams uncompressed through
//! `pdftk - output - uncompress`. Uncompressed PDFs diff and delta-compress
//! far better inside of git's object store.
//!
//! Input and output will __not__ be identical, because pdftk's compress and
//! uncompress are not inverse of each other. Do not use this filter on PDF
//! files that must pass a checksum.
//!
//! When pdftk cannot handle a file, usually because it is password
//! protected, the filter becomes a no-op, and passes the original PDF through
//! unchanged.

use crate::{
    filter::{FailurePolicy, Filter, FilterError, Result, Transform},
    tool::ToolCall,
};

use std::ffi::OsString;
use tracing::{debug, instrument};

/// Default program used to uncompress PDF files.
pub const PDFTK: &str = "pdftk";

/// Uncompress PDF streams through pdftk.
#[derive(Debug, Clone)]
pub struct PdfUncompress {
    program: OsString,
}

impl PdfUncompress {
    /// Construct new PDF filter using `pdftk` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different pdftk program.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for PdfUncompress {
    fn default() -> Self {
        Self {
            program: PDFTK.into(),
        }
    }
}

impl Transform for PdfUncompress {
    /// Uncompress PDF.
    ///
    /// Succeeds only if pdftk exits with zero status __and__ writes nothing to
    /// standard error. pdftk may emit warnings while still exiting
    /// successfully, and the output it produces in that case is not to be
    /// trusted.
    ///
    /// # Errors
    ///
    /// - Return [`FilterError::Tool`] if pdftk cannot be run, or exits with
    ///   non-zero status.
    /// - Return [`FilterError::Diagnostics`] if pdftk writes to standard error.
    #[instrument(skip(self, input), level = "debug")]
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>> {
        let output = ToolCall::new(&self.program)
            .args(["-", "output", "-", "uncompress"])
            .run(Some(input))?;

        if !output.stderr.is_empty() {
            return Err(FilterError::Diagnostics {
                program: self.program.clone(),
                diagnostics: output.diagnostics(),
            });
        }

        debug!("uncompressed PDF of {} bytes", input.len());
        Ok(output.stdout)
    }
}

impl Filter for PdfUncompress {
    fn policy(&self) -> FailurePolicy {
        FailurePolicy::Passthrough
    }
}
