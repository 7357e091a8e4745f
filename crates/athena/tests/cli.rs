// ABOUTME: Integration tests for the athena CLI binary.
// ABOUTME: Covers HTML file parsing, concurrent URL fetching, config files and error exits.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn athena_cmd() -> Command {
    Command::cargo_bin("athena").unwrap()
}

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn parse_html_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("test.html");
    fs::write(
        &html_path,
        r#"<!DOCTYPE html>
<html>
<head><title>Test Page</title></head>
<body>
<nav>Menu links</nav>
<article><p>Hi there</p></article>
</body>
</html>"#,
    )
    .unwrap();

    athena_cmd()
        .arg("--html")
        .arg(&html_path)
        .arg("--url")
        .arg("https://example.com")
        .assert()
        .success()
        .stdout(predicate::str::contains("<article><p>Hi there</p></article>"))
        .stdout(predicate::str::contains("Menu links").not());
}

#[test]
fn markdown_flag_converts_content() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("test.html");
    fs::write(
        &html_path,
        "<html><body><article><p>Plain <em>styled</em> text</p></article></body></html>",
    )
    .unwrap();

    athena_cmd()
        .arg("--html")
        .arg(&html_path)
        .arg("--markdown")
        .assert()
        .success()
        .stdout(predicate::str::contains("styled"))
        .stdout(predicate::str::contains("<em>").not())
        .stdout(predicate::str::contains("<article>").not());
}

#[test]
fn multiple_urls_keep_argument_order() {
    let server = MockServer::start();
    let mock1 = server.mock(|when, then| {
        when.method(GET).path("/page1");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .delay(std::time::Duration::from_millis(300))
            .body("<html><head><title>Page One</title></head><body><article><p>first page</p></article></body></html>");
    });
    let mock2 = server.mock(|when, then| {
        when.method(GET).path("/page2");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body("<html><head><title>Page Two</title></head><body><article><p>second page</p></article></body></html>");
    });

    let output = athena_cmd()
        .arg("--allow-private-networks")
        .arg("--json")
        .arg(server.url("/page1"))
        .arg(server.url("/page2"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    mock1.assert();
    mock2.assert();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let items = parsed.as_array().expect("several URLs print an array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Page One");
    assert_eq!(items[1]["title"], "Page Two");
    assert!(items[0]["wordCount"].is_number());
}

#[test]
fn config_file_options_apply() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("page.html");
    let config_path = temp_dir.path().join("athena.json");
    fs::write(
        &html_path,
        format!(
            r#"<html><body><article><p>{}</p><div class="rating-note"><p>kept note</p></div></article></body></html>"#,
            words("w", 210)
        ),
    )
    .unwrap();
    fs::write(&config_path, r#"{"removePartialSelectors": false, "debug": true}"#).unwrap();

    let output = athena_cmd()
        .arg("--html")
        .arg(&html_path)
        .arg("--config")
        .arg(&config_path)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(parsed["content"].as_str().unwrap().contains("kept note"));
    assert!(parsed["debugInfo"]["steps"].is_array());
}

#[test]
fn timing_flag_prints_elapsed() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("test.html");
    fs::write(&html_path, "<html><body><p>Test</p></body></html>").unwrap();

    athena_cmd()
        .arg("--html")
        .arg(&html_path)
        .arg("--timing")
        .assert()
        .success()
        .stderr(predicate::str::contains("elapsed:"))
        .stderr(predicate::str::contains("ms"));
}

#[test]
fn output_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("test.html");
    let output_path = temp_dir.path().join("output.json");
    fs::write(
        &html_path,
        "<html><body><article><p>Content</p></article></body></html>",
    )
    .unwrap();

    athena_cmd()
        .arg("--html")
        .arg(&html_path)
        .arg("--url")
        .arg("https://example.com")
        .arg("--json")
        .arg("-o")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let output_content = fs::read_to_string(&output_path).unwrap();
    assert!(output_content.contains("\"content\":"));
    assert!(output_content.contains("\"domain\": \"example.com\""));
}

#[test]
fn fetch_errors_exit_nonzero() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(500);
    });

    athena_cmd()
        .arg("--allow-private-networks")
        .arg(server.url("/missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error parsing"));
}

#[test]
fn empty_html_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("empty.html");
    fs::write(&html_path, "   ").unwrap();

    athena_cmd()
        .arg("--html")
        .arg(&html_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid HTML"));
}

#[test]
fn no_args_fails() {
    athena_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one URL is required"));
}
