use std::{fs, path::PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const PEOPLE: &str = "name\tage\tcity\n\
carol\t41\tOslo\n\
alice\t9\tLima\n\
bob\t41\tBern\n\
dave\t23\tLima\n";

fn write_input(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write input");
    path
}

fn sort_cmd(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sheetsortctl");
    // keep stray settings files and env overrides out of the run
    cmd.current_dir(dir.path())
        .env_remove("SHEETSORT_CONFIG_PATH")
        .env_remove("SHEETSORT_CONFIG_JSON")
        .env("RUST_LOG", "warn")
        .arg("sort");
    cmd
}

#[test]
fn typed_key_sorts_numerically() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);

    sort_cmd(&dir)
        .arg(&input)
        .args(["--key", "age", "--type", "age=int"])
        .assert()
        .success()
        .stdout(
            "name\tage\tcity\n\
alice\t9\tLima\n\
dave\t23\tLima\n\
carol\t41\tOslo\n\
bob\t41\tBern\n",
        );
}

#[test]
fn untyped_columns_compare_as_text() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);

    let output = sort_cmd(&dir)
        .arg(&input)
        .args(["--key", "age"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    let ages: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|line| line.split('\t').nth(1).unwrap())
        .collect();
    assert_eq!(ages, vec!["23", "41", "41", "9"]);
}

#[test]
fn mixed_directions_break_ties() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);

    sort_cmd(&dir)
        .arg(&input)
        .args(["--key", "city", "--key", "age:desc", "--type", "age=int"])
        .assert()
        .success()
        .stdout(
            "name\tage\tcity\n\
bob\t41\tBern\n\
dave\t23\tLima\n\
alice\t9\tLima\n\
carol\t41\tOslo\n",
        );
}

#[test]
fn sort_command_uses_the_cursor_column() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);

    sort_cmd(&dir)
        .arg(&input)
        .args(["--command", "sort-desc", "--cursor", "name"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("name\tage\tcity\ndave\t23\tLima\ncarol"));
}

#[test]
fn key_column_commands_use_every_key_column() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);

    sort_cmd(&dir)
        .arg(&input)
        .args([
            "--command",
            "sort-keys-asc",
            "--cursor",
            "name",
            "--key-column",
            "city",
            "--key-column",
            "name",
        ])
        .assert()
        .success()
        .stdout(
            "name\tage\tcity\n\
bob\t41\tBern\n\
alice\t9\tLima\n\
dave\t23\tLima\n\
carol\t41\tOslo\n",
        );
}

#[test]
fn mistyped_values_warn_and_keep_input_order() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "amounts.tsv", "amount\n10\noops\n2\n");

    sort_cmd(&dir)
        .arg(&input)
        .args(["--key", "amount", "--type", "amount=int"])
        .assert()
        .success()
        .stdout("amount\n10\noops\n2\n")
        .stderr(predicate::str::contains("sort incomplete"))
        .stderr(predicate::str::contains("amount"));
}

#[test]
fn unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);

    sort_cmd(&dir)
        .arg(&input)
        .args(["--key", "height"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("height"));
}

#[test]
fn duplicate_header_names_are_ambiguous() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "dupes.tsv", "a\ta\n1\t2\n");

    sort_cmd(&dir)
        .arg(&input)
        .args(["--key", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ambiguous column name"));
}

#[test]
fn headerless_input_uses_positions() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "plain.tsv", "b\t2\na\t3\nc\t1\n");

    sort_cmd(&dir)
        .arg(&input)
        .args(["--no-header", "--key", "2:desc", "--type", "2=int"])
        .assert()
        .success()
        .stdout("a\t3\nb\t2\nc\t1\n");
}

#[test]
fn config_file_sets_delimiter_and_types() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "prices.csv", "item,price\nfig,10.5\npear,9.25\n");
    let config = write_input(
        &dir,
        "settings.toml",
        "tsv_delimiter = \",\"\n\n[column_types]\nprice = \"float\"\n",
    );

    sort_cmd(&dir)
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .args(["--key", "price"])
        .assert()
        .success()
        .stdout("item,price\npear,9.25\nfig,10.5\n");
}

#[test]
fn quoted_fields_keep_their_delimiters() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "people.csv",
        "name,age\n\"Smith, J\",40\nDoe,7\n\"Roe, \"\"R\"\"\",23\n",
    );
    let config = write_input(&dir, "settings.toml", "tsv_delimiter = \",\"\n");

    sort_cmd(&dir)
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .args(["--key", "age", "--type", "age=int"])
        .assert()
        .success()
        .stdout("name,age\nDoe,7\n\"Roe, \"\"R\"\"\",23\n\"Smith, J\",40\n");
}

#[test]
fn non_ascii_delimiter_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);
    let config = write_input(&dir, "settings.toml", "tsv_delimiter = \"§\"\n");

    sort_cmd(&dir)
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .args(["--key", "age"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a single-byte ASCII character"));
}

#[test]
fn unknown_command_is_rejected_by_the_parser() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "people.tsv", PEOPLE);

    sort_cmd(&dir)
        .arg(&input)
        .args(["--command", "sort-sideways", "--cursor", "name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sort-sideways"));
}

#[test]
fn commands_lists_every_sort_command() {
    let mut cmd = cargo_bin_cmd!("sheetsortctl");
    let out = cmd
        .arg("commands")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&out);
    for name in [
        "sort-asc",
        "sort-desc",
        "sort-keys-asc",
        "sort-keys-desc",
        "sort-asc-add",
        "sort-desc-add",
        "sort-keys-asc-add",
        "sort-keys-desc-add",
    ] {
        assert!(text.contains(name), "commands output missing {name}");
    }
}

#[test]
fn sort_help_mentions_key_syntax() {
    let mut cmd = cargo_bin_cmd!("sheetsortctl");
    cmd.args(["sort", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME[:desc]"))
        .stdout(predicate::str::contains("--no-header"));
}
