//! The `ssify` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use ssify::header;
use ssify::test_utils::fixtures::{count, pick};
use ssify::variables::{ExpectType, VariableSet, ssi_expect};

fn ssify() -> Command {
    let mut cmd = Command::cargo_bin("ssify").unwrap();
    cmd.env_remove("RUST_LOG").env("SSIFY_CONFIG", "/nonexistent/ssify.toml");
    cmd
}

#[test]
fn test_hash_prints_identifier() {
    let expected = pick(10i64);
    ssify()
        .args(["hash", "quotes.pick", "[]", r#"{"limit": 10}"#])
        .assert()
        .success()
        .stdout(format!("{}\n", expected.identifier()));
}

#[test]
fn test_hash_rejects_invalid_json() {
    ssify()
        .args(["hash", "quotes.pick", "[oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_inspect_literal_and_file() {
    let pending = pick(ssi_expect(count(), ExpectType::Int).unwrap());
    let vars = [count(), pending.clone()].into_iter().collect::<VariableSet>();
    let value = header::encode(&vars);

    ssify()
        .args(["inspect", &value])
        .assert()
        .success()
        .stdout(predicate::str::contains(count().identifier()))
        .stdout(predicate::str::contains("pending"));

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("header.json");
    std::fs::write(&file, format!("{value}\n")).unwrap();
    ssify()
        .args(["inspect", &format!("@{}", file.display())])
        .assert()
        .success()
        .stdout(predicate::str::contains(pending.identifier()));
}

#[test]
fn test_inspect_invalid_header() {
    ssify()
        .args(["inspect", "[1]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid SSI variables header"));
}

#[test]
fn test_render_with_fragments() {
    let temp = TempDir::new().unwrap();
    let fragments = temp.path().join("fragments");
    std::fs::create_dir_all(fragments.join("quote")).unwrap();
    std::fs::write(
        fragments.join("quote/index.html"),
        "<q><!--#echo var='who' encoding='none'--></q>",
    )
    .unwrap();
    let page = temp.path().join("page.html");
    std::fs::write(
        &page,
        "<!--#set var='who' value='Knuth'--><!--#if expr='${who}'-->by <!--#include virtual='/quote/'--><!--#endif-->",
    )
    .unwrap();

    ssify()
        .arg("render")
        .arg(&page)
        .arg("--fragments")
        .arg(&fragments)
        .assert()
        .success()
        .stdout("by <q>Knuth</q>");
}

#[test]
fn test_render_verbose_directives() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("page.html");
    std::fs::write(&page, "<!--#set var='a' value='1'--><!--#echo var='a' encoding='none'-->")
        .unwrap();

    ssify()
        .arg("render")
        .arg(&page)
        .arg("--verbose-directives")
        .assert()
        .success()
        .stdout(predicate::str::contains("<!--#end-echo var='a' encoding='none'-->"));
}

#[test]
fn test_render_missing_include_suggests_fragments() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("page.html");
    std::fs::write(&page, "<!--#include virtual='/x/'-->").unwrap();

    ssify()
        .arg("render")
        .arg(&page)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Included fragment not found: /x/"))
        .stderr(predicate::str::contains("--fragments"));
}

#[test]
fn test_render_rejects_explicit_missing_config() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("page.html");
    std::fs::write(&page, "plain").unwrap();

    ssify()
        .arg("--config")
        .arg(temp.path().join("missing.toml"))
        .arg("render")
        .arg(&page)
        .assert()
        .failure();
}
