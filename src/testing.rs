// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

/// Write executable shell script standing in for an external tool.
///
/// Callers should be `#[serial]`, because executing a file that another
/// thread's child process still holds open for writing fails with ETXTBSY.
pub(crate) fn fake_tool(
    dir: impl AsRef<Path>,
    name: &str,
    body: &str,
) -> anyhow::Result<PathBuf> {
    let path = dir.as_ref().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;

    Ok(path)
}

/// Check if a real program can be found on `PATH`.
pub(crate) fn have_program(program: &str, version_flag: &str) -> bool {
    std::process::Command::new(program)
        .arg(version_flag)
        .stdin(std::process::Stdio::null())
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
