// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! ZIP repackaging filter.
//!
//! Git cannot delta-compress the deflated members of a ZIP archive, so every
//! tiny edit to, e.g., an OpenDocument file is stored as an entirely new blob.
//! [`Repackage`] rewrites archives with every entry stored uncompressed,
//! which leaves compression to git itself.
//!
//! # OpenDocument Mode
//!
//! OpenDocument containers carry regenerable cache data, i.e., the thumbnail
//! images under `Thumbnails/` and the `layout-cache` file. These change on
//! practically every save without adding any value to the history. In
//! OpenDocument mode those entries are dropped from the repackaged archive.

use crate::{
    filter::{FailurePolicy, Filter, Result, Transform},
    scratch::ScratchDir,
};

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::PathBuf,
};
use tracing::{debug, instrument};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

/// Entry name prefix of OpenDocument thumbnails.
pub const ODF_THUMBNAIL_PREFIX: &str = "Thumbnails/";

/// Entry name of OpenDocument layout cache.
pub const ODF_LAYOUT_CACHE: &str = "layout-cache";

/// Repackage ZIP archives with every entry stored uncompressed.
#[derive(Debug, Clone, Default)]
pub struct Repackage {
    opendocument: bool,
    scratch_root: Option<PathBuf>,
}

impl Repackage {
    /// Construct new repackaging filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle OpenDocument mode.
    pub fn opendocument(mut self, enabled: bool) -> Self {
        self.opendocument = enabled;
        self
    }

    /// Stage scratch files under target directory instead of the system
    /// temporary directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Check if entry should be left out of repackaged archive.
    pub fn skips(&self, name: &str) -> bool {
        self.opendocument && (name.starts_with(ODF_THUMBNAIL_PREFIX) || name == ODF_LAYOUT_CACHE)
    }
}

impl Transform for Repackage {
    /// Repackage archive.
    ///
    /// Entries keep their order, names, modification times, and unix
    /// permissions. Directory entries stay directory entries.
    ///
    /// # Errors
    ///
    /// - Return [`FilterError::Scratch`](crate::filter::FilterError::Scratch)
    ///   if archives cannot be staged.
    /// - Return [`FilterError::Archive`](crate::filter::FilterError::Archive)
    ///   if input is not a readable archive, or output cannot be written.
    #[instrument(skip(self, input), level = "debug")]
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>> {
        let scratch = match &self.scratch_root {
            Some(root) => ScratchDir::new_in(root, "ziphook-")?,
            None => ScratchDir::new("ziphook-")?,
        };
        let source = scratch.write("in.zip", input)?;
        let target = scratch.path("out.zip");

        let mut archive = ZipArchive::new(BufReader::new(File::open(&source)?))?;
        let mut writer = ZipWriter::new(BufWriter::new(File::create(&target)?));

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();
            if self.skips(&name) {
                debug!("skip OpenDocument cache entry {name:?}");
                continue;
            }

            let mut options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Stored)
                .last_modified_time(entry.last_modified().unwrap_or_default())
                .large_file(entry.size() > u64::from(u32::MAX));
            if let Some(mode) = entry.unix_mode() {
                options = options.unix_permissions(mode);
            }

            if entry.is_dir() {
                writer.add_directory(name, options)?;
            } else {
                writer.start_file(name, options)?;
                io::copy(&mut entry, &mut writer)?;
            }
        }

        writer.finish()?.flush()?;
        let bytes = scratch.read("out.zip")?;
        debug!(
            "repackaged archive of {} bytes into {} bytes",
            input.len(),
            bytes.len()
        );
        scratch.close();

        Ok(bytes)
    }
}

impl Filter for Repackage {
    fn policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }
}
