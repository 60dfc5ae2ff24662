// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use assert_cmd::Command;
use git2::Repository;
use predicates::str::contains;
use std::{
    fs,
    io::{Cursor, Read, Write},
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

fn cmd() -> Command {
    Command::cargo_bin("filtrate").unwrap()
}

fn odt() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in [
        ("mimetype", "application/vnd.oasis.opendocument.text"),
        ("content.xml", "<office:document-content/>"),
        ("Thumbnails/thumbnail.png", "png"),
        ("layout-cache", "cache"),
    ] {
        writer.start_file(name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

#[test]
fn strip_whitespace_normalizes_line_ends() {
    cmd()
        .arg("strip-whitespace")
        .write_stdin("a \nb\t\r\nc")
        .assert()
        .success()
        .stdout("a\nb\nc\n");
}

#[test]
fn pdf_clean_passes_input_through_without_pdftk() {
    let input = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec();
    cmd()
        .args(["pdf-clean", "--pdftk", "filtrate-no-such-pdftk"])
        .write_stdin(input.clone())
        .assert()
        .success()
        .stdout(input);
}

#[test]
fn sqlite_clean_fails_without_sqlite() {
    cmd()
        .args(["sqlite-clean", "--sqlite", "filtrate-no-such-sqlite3"])
        .write_stdin("SQLite format 3\0")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(contains("failed to run command"));
}

#[test]
fn sqlite_smudge_accepts_legacy_flag() {
    cmd()
        .args(["sqlite-smudge", "-2", "--sqlite", "filtrate-no-such-sqlite"])
        .write_stdin("BEGIN TRANSACTION;\nCOMMIT;\n")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("filtrate-no-such-sqlite"));
}

#[test]
fn zip_clean_rejects_garbage() {
    cmd()
        .arg("zip-clean")
        .write_stdin("not a zip archive")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(contains("failed to repackage zip archive"));
}

#[test]
fn zip_clean_odf_drops_cache_entries() {
    let output = cmd()
        .args(["zip-clean", "--odf"])
        .write_stdin(odt())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let mut archive = ZipArchive::new(Cursor::new(output)).unwrap();
    let mut names = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        names.push((entry.name().to_string(), contents));
    }

    assert_eq!(
        names,
        vec![
            (
                "mimetype".to_string(),
                "application/vnd.oasis.opendocument.text".to_string()
            ),
            (
                "content.xml".to_string(),
                "<office:document-content/>".to_string()
            ),
        ]
    );
}

#[test]
fn install_registers_sqlite_pair() {
    let root = tempfile::tempdir().unwrap();
    let repository = Repository::init(root.path()).unwrap();

    cmd()
        .arg("install")
        .arg("--repo")
        .arg(root.path())
        .args(["-2", "sqlite", "*.db"])
        .assert()
        .success();

    let config = repository.config().unwrap().snapshot().unwrap();
    assert_eq!(
        config.get_str("filter.sqlite2.clean").unwrap(),
        "filtrate sqlite-clean -2"
    );
    assert_eq!(
        config.get_str("filter.sqlite2.smudge").unwrap(),
        "filtrate sqlite-smudge -2"
    );
    assert_eq!(
        fs::read_to_string(root.path().join(".gitattributes")).unwrap(),
        "*.db filter=sqlite2\n"
    );
}

#[test]
fn install_outside_repository_fails() {
    let root = tempfile::tempdir().unwrap();

    cmd()
        .current_dir(root.path())
        .env("GIT_CEILING_DIRECTORIES", root.path())
        .args(["install", "pdf"])
        .assert()
        .failure()
        .code(1);
}
