// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External tool invocation.
//!
//! Most filters do not transform anything themselves. Instead they hand the
//! data off to some external program, e.g., `pdftk` or `sqlite3`, and then
//! judge the result. [`ToolCall`] is the one place where that happens. It
//! spawns the program, optionally feeds bytes into its standard input, waits
//! for it to exit, and captures everything it wrote to standard output and
//! standard error.
//!
//! There is no timeout handling. A hung tool hangs the caller.

use std::{
    ffi::{OsStr, OsString},
    io::{ErrorKind, Write},
    process::{Command, ExitStatus, Output, Stdio},
    thread,
};
use tracing::{debug, instrument};

/// Invocation of an external program.
#[derive(Debug, Clone)]
pub struct ToolCall {
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCall {
    /// Construct new invocation of target program.
    ///
    /// The program is looked up through `PATH` unless it is given as a path.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a series of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Name or path of program being invoked.
    pub fn program(&self) -> &OsStr {
        self.program.as_os_str()
    }

    /// Run program to completion.
    ///
    /// If `input` is given, it is written to the program's standard input
    /// from a scoped thread, and the pipe is closed afterwards. Otherwise the
    /// program gets a null standard input.
    ///
    /// # Errors
    ///
    /// - Return [`ToolError::Spawn`] if program cannot be started.
    /// - Return [`ToolError::Io`] if communication with program fails.
    /// - Return [`ToolError::Exit`] if program exits with non-zero status.
    #[instrument(skip(self, input), level = "debug")]
    pub fn run(&self, input: Option<&[u8]>) -> Result<ToolOutput> {
        debug!("run {:?} with arguments {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(match input {
                Some(_) => Stdio::piped(),
                None => Stdio::null(),
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match (input, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => thread::scope(|scope| -> std::io::Result<Output> {
                let feeder = scope.spawn(move || match stdin.write_all(bytes) {
                    // INVARIANT: Tool may exit before draining its input, let exit status decide.
                    Err(error) if error.kind() == ErrorKind::BrokenPipe => Ok(()),
                    result => result,
                });
                let output = child.wait_with_output()?;
                feeder
                    .join()
                    .map_err(|_| std::io::Error::other("stdin feeder thread panicked"))??;
                Ok(output)
            }),
            _ => child.wait_with_output(),
        }
        .map_err(|source| ToolError::Io {
            program: self.program.clone(),
            source,
        })?;

        let output = ToolOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        debug!(
            "{:?} exited with {}, {} bytes on stdout, {} bytes on stderr",
            self.program,
            output.status,
            output.stdout.len(),
            output.stderr.len()
        );

        if !output.status.success() {
            return Err(ToolError::Exit {
                program: self.program.clone(),
                status: output.status,
                diagnostics: output.diagnostics(),
            });
        }

        Ok(output)
    }
}

/// Everything a finished program left behind.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// Diagnostic text of program.
    ///
    /// Prefers standard error. Falls back to standard output when standard
    /// error is empty, because some tools report failures there instead.
    /// Trailing whitespace is chomped.
    pub fn diagnostics(&self) -> String {
        let raw = if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };

        String::from_utf8_lossy(raw).trim_end().to_string()
    }
}

/// External tool invocation error types.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Program could not be started at all.
    #[error("failed to run command {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: OsString,
    },

    /// Piping data to or from program failed.
    #[error("failed to communicate with command {program:?}")]
    Io {
        #[source]
        source: std::io::Error,
        program: OsString,
    },

    /// Program reported failure through its exit status.
    #[error("command {program:?} failed with {status}:\n{}", or_silence(diagnostics))]
    Exit {
        program: OsString,
        status: ExitStatus,
        diagnostics: String,
    },
}

fn or_silence(diagnostics: &str) -> &str {
    if diagnostics.is_empty() {
        "<no diagnostic output>"
    } else {
        diagnostics
    }
}

/// Friendly result alias :3
pub type Result<T, E = ToolError> = std::result::Result<T, E>;
