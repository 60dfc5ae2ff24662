// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filter driver installation.
//!
//! Git only runs a filter once two things are in place. The repository's
//! configuration must define a __filter driver__, i.e., the commands git runs
//! on clean and smudge:
//!
//! ```text
//! [filter "sqlite3"]
//!         clean = filtrate sqlite-clean
//!         smudge = filtrate sqlite-smudge
//!         required = true
//! ```
//!
//! And `.gitattributes` must route files to that driver by pattern:
//!
//! ```text
//! *.db    filter=sqlite3
//! ```
//!
//! [`install`] writes both. Clean and smudge commands of one driver are
//! always generated together from one [`Driver`], so a SQLite pair can never
//! disagree on which SQLite variant it drives.

use crate::sqlite::SqliteVariant;

use git2::{ConfigLevel, Repository};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Name of filtrate binary as it appears in filter commands.
pub const BIN_NAME: &str = "filtrate";

/// Filter driver definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// PDF decompression, clean only.
    Pdf,

    /// SQLite dump and restore pair.
    Sqlite(SqliteVariant),

    /// Trailing whitespace removal, clean only.
    StripWhitespace,

    /// ZIP repackaging, clean only. Flag toggles OpenDocument mode.
    Zip { opendocument: bool },
}

impl Driver {
    /// Default driver name to register under `filter.<name>`.
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Sqlite(SqliteVariant::Sqlite3) => "sqlite3",
            Self::Sqlite(SqliteVariant::Sqlite2) => "sqlite2",
            Self::StripWhitespace => "stripspace",
            Self::Zip { opendocument: false } => "zip",
            Self::Zip { opendocument: true } => "odf",
        }
    }

    /// Command git runs on clean.
    pub fn clean_command(&self) -> String {
        match self {
            Self::Pdf => format!("{BIN_NAME} pdf-clean"),
            Self::Sqlite(variant) => format!("{BIN_NAME} sqlite-clean{}", legacy_flag(*variant)),
            Self::StripWhitespace => format!("{BIN_NAME} strip-whitespace"),
            Self::Zip { opendocument } => format!(
                "{BIN_NAME} zip-clean{}",
                if *opendocument { " --odf" } else { "" }
            ),
        }
    }

    /// Command git runs on smudge, if any.
    pub fn smudge_command(&self) -> Option<String> {
        match self {
            Self::Sqlite(variant) => Some(format!(
                "{BIN_NAME} sqlite-smudge{}",
                legacy_flag(*variant)
            )),
            _ => None,
        }
    }

    /// Whether git must abort when filter fails.
    ///
    /// Only filters that pass input through on failure can afford to be
    /// optional.
    pub fn required(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

impl Display for Driver {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.default_name())
    }
}

fn legacy_flag(variant: SqliteVariant) -> &'static str {
    match variant {
        SqliteVariant::Sqlite3 => "",
        SqliteVariant::Sqlite2 => " -2",
    }
}

/// Installation request.
#[derive(Debug, Clone)]
pub struct Installation {
    pub driver: Driver,
    pub name: String,
    pub patterns: Vec<String>,
}

impl Installation {
    /// Construct new installation of driver under its default name.
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            name: driver.default_name().into(),
            patterns: Vec::new(),
        }
    }

    /// Register driver under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Route files matching patterns to driver.
    pub fn with_patterns(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }
}

/// Install filter driver into repository.
///
/// Discovers the repository from `path`, writes the filter driver into its
/// local configuration, and appends one `.gitattributes` line per pattern at
/// the top-level of its work tree. Patterns already routed to the driver are
/// not duplicated.
///
/// # Errors
///
/// - Return [`InstallError::Git2`] if repository or its configuration cannot
///   be accessed.
/// - Return [`InstallError::Bare`] if patterns are given for a bare
///   repository.
/// - Return [`InstallError::Gitattributes`] if `.gitattributes` cannot be
///   read or written.
#[instrument(skip(path, installation), level = "debug")]
pub fn install(path: impl AsRef<Path>, installation: &Installation) -> Result<()> {
    let repository = Repository::discover(path.as_ref())?;
    let name = &installation.name;
    let driver = installation.driver;
    info!("install filter driver {name:?} as {driver}");

    let mut config = repository.config()?.open_level(ConfigLevel::Local)?;
    config.set_str(&format!("filter.{name}.clean"), &driver.clean_command())?;
    match driver.smudge_command() {
        Some(smudge) => config.set_str(&format!("filter.{name}.smudge"), &smudge)?,
        None => {
            // INVARIANT: Leftover smudge from an earlier install would break the pair.
            if config.get_entry(&format!("filter.{name}.smudge")).is_ok() {
                config.remove(&format!("filter.{name}.smudge"))?;
            }
        }
    }
    config.set_bool(&format!("filter.{name}.required"), driver.required())?;

    if installation.patterns.is_empty() {
        return Ok(());
    }

    let work_tree = repository.workdir().ok_or_else(|| InstallError::Bare {
        repository: repository.path().to_path_buf(),
    })?;
    track_patterns(work_tree.join(".gitattributes"), name, &installation.patterns)
}

fn track_patterns(
    gitattributes: impl AsRef<Path>,
    name: &str,
    patterns: &[String],
) -> Result<()> {
    let gitattributes = gitattributes.as_ref();
    let mut content = if gitattributes.exists() {
        fs::read_to_string(gitattributes).map_err(|source| InstallError::Gitattributes {
            source,
            path: gitattributes.to_path_buf(),
        })?
    } else {
        String::new()
    };

    let mut changed = false;
    for pattern in patterns {
        let line = format!("{pattern} filter={name}");
        if content.lines().any(|existing| existing.trim() == line) {
            debug!("pattern {pattern:?} already routed to {name:?}");
            continue;
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&line);
        content.push('\n');
        changed = true;
        info!("route {pattern:?} to filter driver {name:?}");
    }

    if changed {
        fs::write(gitattributes, content).map_err(|source| InstallError::Gitattributes {
            source,
            path: gitattributes.to_path_buf(),
        })?;
    }

    Ok(())
}

/// Filter driver installation error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Bare repositories have no work tree for `.gitattributes`.
    #[error("cannot route patterns in bare repository {:?}", repository.display())]
    Bare { repository: PathBuf },

    /// Attributes file cannot be read or written.
    #[error("failed to update {:?}", path.display())]
    Gitattributes {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = InstallError> = std::result::Result<T, E>;
