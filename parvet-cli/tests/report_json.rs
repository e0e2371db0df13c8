mod common;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::process::Command;

#[test]
fn json_report_carries_totals_and_statuses() {
    let td = assert_fs::TempDir::new().unwrap();
    let data_dir = td.child("data");
    data_dir.create_dir_all().unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    let a: Vec<u8> = (0..4096).map(|_| rng.gen()).collect();
    let b: Vec<u8> = (0..1500).map(|_| rng.gen()).collect();
    std::fs::write(data_dir.child("a.bin").path(), &a).unwrap();
    // b.bin is never written: the whole file is missing.

    let desc = common::description(
        &[0xD1; 16],
        512,
        &[([1; 16], "a.bin", &a), ([2; 16], "b.bin", &b)],
    );
    td.child("set.par2").write_binary(&desc).unwrap();

    let out = Command::cargo_bin("parvet")
        .unwrap()
        .current_dir(td.path())
        .args(["verify", "set.par2", "data", "--json"])
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();

    // b.bin: 1500 bytes over 512-byte slices -> 3 blocks, all needed.
    assert_eq!(report["blocks_needed"], 3);
    assert_eq!(report["slice_len"], 512);
    assert_eq!(report["set_id_hex"], "d1".repeat(16));
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["status"], "ok");
    assert_eq!(files[0]["name"], "a.bin");
    assert_eq!(files[0]["blocks_missing"], 0);
    assert_eq!(files[1]["status"], "missing");
    assert_eq!(files[1]["name"], "b.bin");
    assert_eq!(files[1]["blocks_total"], 3);
    assert_eq!(files[1]["blocks_missing"], 3);
    assert!(report["generated_utc"].as_str().unwrap().contains('T'));
}

#[test]
fn info_json_round_trips_the_summary() {
    let td = assert_fs::TempDir::new().unwrap();
    let desc = common::description(
        &[0xD2; 16],
        128,
        &[([3; 16], "one.dat", &[1u8; 300]), ([4; 16], "two.dat", &[2u8; 128])],
    );
    td.child("set.par2").write_binary(&desc).unwrap();

    let out = Command::cargo_bin("parvet")
        .unwrap()
        .current_dir(td.path())
        .args(["info", "set.par2", "--json"])
        .assert()
        .success();
    let summary: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();

    assert_eq!(summary["set_id_hex"], "d2".repeat(16));
    assert_eq!(summary["slice_len"], 128);
    assert_eq!(summary["complete"], true);
    let files = summary["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], "one.dat");
    assert_eq!(files[0]["block_count"], 3);
    assert_eq!(files[1]["name"], "two.dat");
    assert_eq!(files[1]["block_count"], 1);
}
