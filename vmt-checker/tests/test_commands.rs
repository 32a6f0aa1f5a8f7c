// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

use std::process::Command;

fn vmt_checker() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vmt-checker"));
    cmd.arg("--color=never");
    cmd
}

#[test]
fn print_counter() {
    let out = vmt_checker()
        .arg("print")
        .arg("tests/counter.vmt")
        .output()
        .expect("could not run vmt-checker");
    assert!(out.status.success(), "vmt-checker should succeed");
    let stdout = String::from_utf8(out.stdout).expect("non-utf8 output");
    insta::assert_snapshot!(stdout.trim_end(), @r###"
    --- State variables ---
    int x

    --- Input variables ---
    bool a

    --- Init constraints ---
    x = 0

    --- Trans constraints ---
    x' = x + 1

    --- Properties ---
    0) invar: 0 <= x
    "###);
}

#[test]
fn dump_is_stable() {
    let out = vmt_checker()
        .arg("dump")
        .arg("tests/counter.vmt")
        .output()
        .expect("could not run vmt-checker");
    assert!(out.status.success(), "vmt-checker should succeed");
    let stdout = String::from_utf8(out.stdout).expect("non-utf8 output");
    let input = std::fs::read_to_string("tests/counter.vmt").unwrap();
    // the demo file is already in canonical form
    assert_eq!(stdout, input);
}

#[test]
fn parse_errors_fail() {
    let out = vmt_checker()
        .arg("print")
        .arg("tests/garbage.vmt")
        .output()
        .expect("could not run vmt-checker");
    assert!(!out.status.success());
}
