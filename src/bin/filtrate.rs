// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use filtrate::{
    install, whitespace::strip_lines, Driver, Filter, Installation, PdfUncompress, Repackage,
    SqliteDump, SqliteLoad, SqliteVariant,
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::{
    ffi::OsString,
    io::{self, BufWriter, Read, Write},
    path::PathBuf,
    process::exit,
};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  filtrate <filter> [options] < input > output\n  filtrate install [options] <driver>",
    subcommand_help_heading = "Filters",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::PdfClean(opts) => run_pdf_clean(opts),
            Command::SqliteClean(opts) => run_sqlite_clean(opts),
            Command::SqliteSmudge(opts) => run_sqlite_smudge(opts),
            Command::StripWhitespace => run_strip_whitespace(),
            Command::ZipClean(opts) => run_zip_clean(opts),
            Command::Install(opts) => run_install(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Uncompress PDF through pdftk, pass it through unchanged on failure.
    #[command(override_usage = "filtrate pdf-clean [options] < input.pdf")]
    PdfClean(PdfOptions),

    /// Dump binary SQLite database as SQL.
    #[command(override_usage = "filtrate sqlite-clean [options] < input.db")]
    SqliteClean(SqliteOptions),

    /// Restore binary SQLite database from SQL dump.
    #[command(override_usage = "filtrate sqlite-smudge [options] < input.sql")]
    SqliteSmudge(SqliteOptions),

    /// Strip trailing whitespace from every line.
    #[command(override_usage = "filtrate strip-whitespace < input")]
    StripWhitespace,

    /// Repackage ZIP archive with every entry stored uncompressed.
    #[command(override_usage = "filtrate zip-clean [options] < input.zip")]
    ZipClean(ZipOptions),

    /// Install filter driver into git repository.
    #[command(override_usage = "filtrate install [options] <driver> [<pattern>]...")]
    Install(InstallOptions),
}

#[derive(Args, Clone, Debug)]
struct PdfOptions {
    /// Path to pdftk program.
    #[arg(long, value_name = "program")]
    pub pdftk: Option<OsString>,
}

#[derive(Args, Clone, Debug)]
struct SqliteOptions {
    /// Use legacy SQLite 2 program "sqlite" instead of "sqlite3".
    #[arg(short = '2', long)]
    pub legacy: bool,

    /// Path to SQLite program, overrides choice of --legacy.
    #[arg(long, value_name = "program")]
    pub sqlite: Option<OsString>,
}

#[derive(Args, Clone, Debug)]
struct ZipOptions {
    /// Drop OpenDocument thumbnails and layout cache.
    #[arg(long)]
    pub odf: bool,
}

#[derive(Args, Clone, Debug)]
struct InstallOptions {
    /// Kind of filter driver to install.
    #[arg(value_enum, value_name = "driver")]
    pub driver: DriverKind,

    /// File patterns to route to driver through .gitattributes.
    #[arg(value_name = "pattern")]
    pub patterns: Vec<String>,

    /// Path inside of target repository.
    #[arg(short, long, value_name = "path", default_value = ".")]
    pub repo: PathBuf,

    /// Register driver under this name instead of the default.
    #[arg(short, long, value_name = "name")]
    pub name: Option<String>,

    /// Use legacy SQLite 2 for sqlite driver.
    #[arg(short = '2', long)]
    pub legacy: bool,

    /// Use OpenDocument mode for zip driver.
    #[arg(long)]
    pub odf: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    Pdf,
    Sqlite,
    Stripspace,
    Zip,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_default();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut input = Vec::new();
    io::stdin().lock().read_to_end(&mut input)?;
    Ok(input)
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}

fn run_filter(filter: &impl Filter) -> Result<()> {
    let outcome = filter.filter(read_stdin()?)?;
    if outcome.is_passthrough() {
        warn!("filter failed, emitting input unchanged");
    }
    write_stdout(&outcome.into_bytes())
}

fn run_pdf_clean(opts: PdfOptions) -> Result<()> {
    let mut filter = PdfUncompress::new();
    if let Some(pdftk) = opts.pdftk {
        filter = filter.with_program(pdftk);
    }

    run_filter(&filter)
}

fn run_sqlite_clean(opts: SqliteOptions) -> Result<()> {
    let mut filter = SqliteDump::new(SqliteVariant::from_legacy(opts.legacy));
    if let Some(sqlite) = opts.sqlite {
        filter = filter.with_program(sqlite);
    }

    run_filter(&filter)
}

fn run_sqlite_smudge(opts: SqliteOptions) -> Result<()> {
    let mut filter = SqliteLoad::new(SqliteVariant::from_legacy(opts.legacy));
    if let Some(sqlite) = opts.sqlite {
        filter = filter.with_program(sqlite);
    }

    run_filter(&filter)
}

fn run_strip_whitespace() -> Result<()> {
    strip_lines(io::stdin().lock(), BufWriter::new(io::stdout().lock()))?;
    Ok(())
}

fn run_zip_clean(opts: ZipOptions) -> Result<()> {
    run_filter(&Repackage::new().opendocument(opts.odf))
}

fn run_install(opts: InstallOptions) -> Result<()> {
    let driver = match opts.driver {
        DriverKind::Pdf => Driver::Pdf,
        DriverKind::Sqlite => Driver::Sqlite(SqliteVariant::from_legacy(opts.legacy)),
        DriverKind::Stripspace => Driver::StripWhitespace,
        DriverKind::Zip => Driver::Zip {
            opendocument: opts.odf,
        },
    };

    let mut installation = Installation::new(driver).with_patterns(opts.patterns);
    if let Some(name) = opts.name {
        installation = installation.with_name(name);
    }

    install(opts.repo, &installation)?;
    Ok(())
}
