#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Integration tests for the nitro CLI

use assert_cmd::Command;
use nitro_formats::fat;
use nitro_formats::nitrofs::FntBuilder;
use predicates::prelude::*;
use tempfile::TempDir;

fn nitro() -> Command {
    Command::cargo_bin("nitro").unwrap()
}

/// Pack three files and return the temp dir plus the archive path
fn packed_archive() -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("b.bin"), b"second").unwrap();
    std::fs::write(input.join("a.bin"), b"first").unwrap();
    std::fs::write(input.join("c.bin"), b"").unwrap();

    let archive = temp.path().join("out.narc");
    nitro()
        .arg("pack")
        .arg(&input)
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 files"));
    (temp, archive)
}

#[test]
fn test_help_command() {
    nitro()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("pack"))
        .stdout(predicate::str::contains("tree"));
}

#[test]
fn test_invalid_command() {
    nitro()
        .arg("invalid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_pack_then_extract_preserves_order() {
    let (temp, archive) = packed_archive();
    let output = temp.path().join("extracted");

    nitro()
        .arg("extract")
        .arg(&archive)
        .arg(&output)
        .assert()
        .success();

    assert_eq!(std::fs::read(output.join("0000.bin")).unwrap(), b"first");
    assert_eq!(std::fs::read(output.join("0001.bin")).unwrap(), b"second");
    assert_eq!(std::fs::read(output.join("0002.bin")).unwrap(), b"");
}

#[test]
fn test_info_text() {
    let (_temp, archive) = packed_archive();
    nitro()
        .arg("info")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("files:        3"))
        .stdout(predicate::str::contains("BTAF 36"));
}

#[test]
fn test_info_json() {
    let (_temp, archive) = packed_archive();
    let output = nitro()
        .args(["--format", "json", "info"])
        .arg(&archive)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["files"].as_array().unwrap().len(), 3);
    assert_eq!(value["files"][1]["start"], 5);
    assert_eq!(value["files"][1]["end"], 11);
    assert_eq!(value["warnings"].as_array().unwrap().len(), 0);
}

#[test]
fn test_info_reports_stored_extents() {
    // Second file aligned to 4 bytes, leaving one byte of padding
    let mut data = Vec::new();
    data.extend_from_slice(b"NARC");
    data.extend_from_slice(&[0xFE, 0xFF, 0x00, 0x01]);
    data.extend_from_slice(&64u32.to_le_bytes());
    data.extend_from_slice(&16u16.to_le_bytes());
    data.extend_from_slice(&3u16.to_le_bytes());
    data.extend_from_slice(b"BTAF");
    data.extend_from_slice(&28u32.to_le_bytes());
    data.extend_from_slice(&2u32.to_le_bytes());
    for value in [0u32, 3, 4, 8] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(b"BTNF");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(b"GMIF");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(b"abc\0wxyz");

    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("aligned.narc");
    std::fs::write(&archive, data).unwrap();

    let output = nitro()
        .args(["--format", "json", "info"])
        .arg(&archive)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["files"][1]["start"], 4);
    assert_eq!(value["files"][1]["end"], 8);
    assert_eq!(value["files"][1]["size"], 4);
}

#[test]
fn test_info_rejects_corrupt_table() {
    let (_temp, archive) = packed_archive();
    let mut data = std::fs::read(&archive).unwrap();
    data[20] ^= 0x08;
    std::fs::write(&archive, data).unwrap();

    nitro()
        .arg("info")
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("allocation table size mismatch"));
}

#[test]
fn test_tree_prints_directories() {
    let temp = TempDir::new().unwrap();
    let layout = FntBuilder::new()
        .add_file("data/map.bin")
        .add_file("icon.bin")
        .build()
        .unwrap();
    let extents = fat::extents_from_lengths([4usize, 4]).unwrap();
    let fat_bytes = fat::encode_raw(&extents).unwrap();

    let mut image = vec![0u8; 0x40];
    image.extend_from_slice(&fat_bytes);
    let fnt_offset = image.len();
    image.extend_from_slice(&layout.data);
    let rom = temp.path().join("game.nds");
    std::fs::write(&rom, &image).unwrap();

    nitro()
        .arg("tree")
        .arg(&rom)
        .args(["--fat-offset", "0x40", "--fat-size"])
        .arg(fat_bytes.len().to_string())
        .arg("--fnt-offset")
        .arg(fnt_offset.to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("root\n data\n  map.bin\nicon.bin\n"));
}
