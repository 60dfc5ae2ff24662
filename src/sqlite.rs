// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! SQLite dump and restore filters.
//!
//! Instead of a binary database, git stores a plain SQL dump of it. Dumps are
//! far easier to diff and compress. The clean side, [`SqliteDump`], turns a
//! database into a dump through `sqlite3 <db> .dump`. The smudge side,
//! [`SqliteLoad`], replays the dump into a fresh database through
//! `sqlite3 <db> ".read <dump>" .quit`.
//!
//! Both sides must agree on the [`SqliteVariant`] being used, or the round
//! trip through the dump will not reproduce the database.
//!
//! Both filters are fatal. Storing the binary database unchanged would
//! silently break the promise of diff-friendly history, so any failure makes
//! git abort instead.

use crate::{
    filter::{FailurePolicy, Filter, FilterError, Result, Transform},
    scratch::ScratchDir,
    tool::ToolCall,
};

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Dump SQLite produces for a file it could not make sense of.
pub const EMPTY_DUMP: &str = "BEGIN TRANSACTION;\nCOMMIT;\n";

/// Which SQLite command line shell to drive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SqliteVariant {
    /// SQLite 3 through `sqlite3`.
    #[default]
    Sqlite3,

    /// Legacy SQLite 2 through `sqlite`.
    Sqlite2,
}

impl SqliteVariant {
    /// Select variant from legacy flag.
    pub fn from_legacy(legacy: bool) -> Self {
        if legacy {
            Self::Sqlite2
        } else {
            Self::Sqlite3
        }
    }

    /// Program name of variant.
    pub fn program(self) -> &'static str {
        match self {
            Self::Sqlite3 => "sqlite3",
            Self::Sqlite2 => "sqlite",
        }
    }
}

/// Check if dump is nothing more than an empty transaction.
///
/// Newer SQLite shells prefix every dump with `PRAGMA` statements, so those
/// are skipped before comparing against [`EMPTY_DUMP`].
pub fn is_empty_dump(dump: &[u8]) -> bool {
    let mut rest = dump;
    while rest.starts_with(b"PRAGMA ") {
        rest = match rest.iter().position(|byte| *byte == b'\n') {
            Some(end) => &rest[end + 1..],
            None => &[],
        };
    }

    rest == EMPTY_DUMP.as_bytes()
}

/// Turn binary SQLite database into SQL dump.
#[derive(Debug, Clone, Default)]
pub struct SqliteDump {
    program: Option<OsString>,
    variant: SqliteVariant,
    scratch_root: Option<PathBuf>,
}

impl SqliteDump {
    /// Construct new dump filter for target SQLite variant.
    pub fn new(variant: SqliteVariant) -> Self {
        Self {
            variant,
            ..Default::default()
        }
    }

    /// Use a different SQLite program than the one the variant implies.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Stage scratch files under target directory instead of the system
    /// temporary directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn program(&self) -> OsString {
        resolve_program(self.program.as_ref(), self.variant)
    }
}

impl Transform for SqliteDump {
    /// Dump database.
    ///
    /// # Errors
    ///
    /// - Return [`FilterError::Scratch`] if database cannot be staged.
    /// - Return [`FilterError::Tool`] if SQLite cannot be run, or fails.
    /// - Return [`FilterError::EmptyDump`] if SQLite dumps an empty
    ///   transaction.
    #[instrument(skip(self, input), level = "debug")]
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>> {
        let scratch = open_scratch(self.scratch_root.as_deref(), "sqlite_dump-")?;
        let database = scratch.write("in.db", input)?;

        let output = ToolCall::new(self.program())
            .arg(&database)
            .arg(".dump")
            .run(None)?;

        if is_empty_dump(&output.stdout) {
            return Err(FilterError::EmptyDump);
        }

        debug!(
            "dumped database of {} bytes into {} bytes of SQL",
            input.len(),
            output.stdout.len()
        );
        scratch.close();

        Ok(output.stdout)
    }
}

impl Filter for SqliteDump {
    fn policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }
}

/// Turn SQL dump back into binary SQLite database.
#[derive(Debug, Clone, Default)]
pub struct SqliteLoad {
    program: Option<OsString>,
    variant: SqliteVariant,
    scratch_root: Option<PathBuf>,
}

impl SqliteLoad {
    /// Construct new restore filter for target SQLite variant.
    pub fn new(variant: SqliteVariant) -> Self {
        Self {
            variant,
            ..Default::default()
        }
    }

    /// Use a different SQLite program than the one the variant implies.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Stage scratch files under target directory instead of the system
    /// temporary directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn program(&self) -> OsString {
        resolve_program(self.program.as_ref(), self.variant)
    }
}

impl Transform for SqliteLoad {
    /// Restore database from dump.
    ///
    /// SQLite can exit successfully on malformed input without ever creating
    /// the output database. Thus, the existence of the database file is
    /// checked on its own.
    ///
    /// # Errors
    ///
    /// - Return [`FilterError::Scratch`] if dump or database cannot be
    ///   staged.
    /// - Return [`FilterError::Tool`] if SQLite cannot be run, or fails.
    /// - Return [`FilterError::MissingOutput`] if SQLite does not create the
    ///   database file.
    #[instrument(skip(self, input), level = "debug")]
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>> {
        let scratch = open_scratch(self.scratch_root.as_deref(), "sqlite_load-")?;
        let dump = scratch.write("in.sql", input)?;
        let database = scratch.path("out.db");

        let mut read = OsString::from(".read '");
        read.push(dump.as_os_str());
        read.push("'");

        let program = self.program();
        let output = ToolCall::new(&program)
            .arg(&database)
            .arg(read)
            .arg(".quit")
            .run(None)?;

        if !database.try_exists()? {
            return Err(FilterError::MissingOutput {
                program,
                diagnostics: output.diagnostics(),
            });
        }

        let bytes = scratch.read("out.db")?;
        debug!(
            "restored database of {} bytes from {} bytes of SQL",
            bytes.len(),
            input.len()
        );
        scratch.close();

        Ok(bytes)
    }
}

impl Filter for SqliteLoad {
    fn policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }
}

fn resolve_program(program: Option<&OsString>, variant: SqliteVariant) -> OsString {
    program
        .cloned()
        .unwrap_or_else(|| variant.program().into())
}

fn open_scratch(root: Option<&Path>, prefix: &str) -> Result<ScratchDir> {
    let scratch = match root {
        Some(root) => ScratchDir::new_in(root, prefix)?,
        None => ScratchDir::new(prefix)?,
    };

    Ok(scratch)
}
