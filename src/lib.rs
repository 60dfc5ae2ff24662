// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git clean and smudge filters.
//!
//! Git lets a repository run every file through a __filter driver__ on its way
//! into the object store (clean) and on its way back out into the work tree
//! (smudge). Filtrate provides a handful of such filters that normalize files
//! which git otherwise stores poorly:
//!
//! - [`pdf`]: uncompress PDF streams through pdftk.
//! - [`sqlite`]: store SQLite databases as SQL dumps, and restore them again.
//! - [`whitespace`]: strip trailing whitespace from text files.
//! - [`archive`]: repackage ZIP archives without compression.
//!
//! Each filter reads one file from standard input, applies exactly one
//! transformation, and writes the result to standard output. Filters never
//! talk to each other. What they share is plumbing: the [`Filter`] contract
//! with its [`FailurePolicy`], the [`ToolCall`] adapter for external
//! programs, and the self-cleaning [`ScratchDir`].

pub mod archive;
pub mod filter;
pub mod install;
pub mod pdf;
pub mod scratch;
pub mod sqlite;
pub mod tool;
pub mod whitespace;

#[cfg(all(test, unix))]
pub(crate) mod testing;

#[doc(inline)]
pub use crate::{
    archive::Repackage,
    filter::{FailurePolicy, Filter, FilterError, Outcome, Transform},
    install::{install, Driver, Installation},
    pdf::PdfUncompress,
    scratch::ScratchDir,
    sqlite::{SqliteDump, SqliteLoad, SqliteVariant},
    tool::ToolCall,
    whitespace::StripWhitespace,
};
