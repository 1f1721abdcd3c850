//! End-to-end run against a mock controller: real HTTP, real bundle
//! extraction and real script processes.

mod common;

use common::make_tar;
use mockito::Matcher;
use remote_scripts::{download_and_run, HttpController, RunContext, SignalStatus, SystemLauncher};
use std::time::Duration;

fn status_field(status: &str) -> Matcher {
    Matcher::Regex(format!("name=\"status\"\r\n\r\n{}\r\n", status))
}

#[test]
fn test_full_run_against_mock_controller() {
    let index = serde_json::json!({
        "1.0": {
            "commissioning_scripts": [{
                "name": "hello", "path": "commissioning/hello",
                "script_result_id": 7, "script_version_id": 8
            }],
            "testing_scripts": [{
                "name": "broken", "path": "testing/broken",
                "script_result_id": 9, "script_version_id": 10
            }]
        }
    })
    .to_string();
    let bundle = make_tar(&[
        ("index.json", index.as_bytes(), 0o644),
        ("commissioning/hello", b"#!/bin/sh\necho hello from commissioning\n", 0o755),
        ("testing/broken", b"#!/bin/sh\necho disk error >&2\nexit 4\n", 0o755),
    ]);

    let mut server = mockito::Server::new();
    let download = server
        .mock("GET", "/metadata/maas-scripts/")
        .match_header("authorization", Matcher::Regex("^OAuth ".to_string()))
        .with_status(200)
        .with_body(bundle)
        .create();
    let testing = server
        .mock("POST", "/metadata/")
        .match_body(status_field("TESTING"))
        .with_status(200)
        .expect(1)
        .create();
    let hello_finished = server
        .mock("POST", "/metadata/")
        .match_body(Matcher::AllOf(vec![
            status_field("WORKING"),
            Matcher::Regex("Finished hello \\[1/1\\]: 0".to_string()),
            Matcher::Regex("hello from commissioning".to_string()),
        ]))
        .with_status(200)
        .expect(1)
        .create();
    let broken_finished = server
        .mock("POST", "/metadata/")
        .match_body(Matcher::AllOf(vec![
            status_field("WORKING"),
            Matcher::Regex("Finished broken \\[1/1\\]: 4".to_string()),
            Matcher::Regex("disk error".to_string()),
        ]))
        .with_status(200)
        .expect(1)
        .create();
    let starting = server
        .mock("POST", "/metadata/")
        .match_body(Matcher::AllOf(vec![
            status_field("WORKING"),
            Matcher::Regex("Starting (hello|broken) \\[1/1\\]".to_string()),
        ]))
        .with_status(200)
        .expect(2)
        .create();
    let verdict = server
        .mock("POST", "/metadata/")
        .match_body(Matcher::AllOf(vec![
            status_field("FAILED"),
            Matcher::Regex("1 scripts failed to run".to_string()),
        ]))
        .with_status(200)
        .expect(1)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let controller = HttpController::new(
        &format!("{}/metadata/", server.url()),
        "ckey:tkey:tsecret".parse().unwrap(),
        Duration::from_secs(10),
    )
    .unwrap();
    let ctx = RunContext {
        controller: &controller,
        launcher: &SystemLauncher,
        scripts_dir: dir.path().join("scripts"),
        out_dir: dir.path().join("out"),
    };

    let summary = download_and_run(&ctx, "maas-scripts/").unwrap();

    assert_eq!(summary.status, SignalStatus::Failed);
    assert_eq!(summary.tally.failed, 1);
    assert_eq!(
        std::fs::read_to_string(ctx.out_dir.join("hello")).unwrap(),
        "hello from commissioning\n"
    );
    assert_eq!(
        std::fs::read_to_string(ctx.out_dir.join("broken.err")).unwrap(),
        "disk error\n"
    );

    download.assert();
    testing.assert();
    hello_finished.assert();
    broken_finished.assert();
    starting.assert();
    verdict.assert();
}

#[test]
fn test_signal_rejection_aborts_run() {
    let index = serde_json::json!({
        "1.0": { "testing_scripts": [{
            "name": "t", "path": "t", "script_result_id": 1, "script_version_id": 1
        }] }
    })
    .to_string();
    let bundle = make_tar(&[
        ("index.json", index.as_bytes(), 0o644),
        ("t", b"#!/bin/sh\nexit 0\n", 0o755),
    ]);

    let mut server = mockito::Server::new();
    let _download = server
        .mock("GET", "/maas-scripts/")
        .with_status(200)
        .with_body(bundle)
        .create();
    let _rejected = server.mock("POST", "/").with_status(500).create();

    let dir = tempfile::tempdir().unwrap();
    let controller =
        HttpController::new(&server.url(), "a:b:c".parse().unwrap(), Duration::from_secs(10))
            .unwrap();
    let ctx = RunContext {
        controller: &controller,
        launcher: &SystemLauncher,
        scripts_dir: dir.path().join("scripts"),
        out_dir: dir.path().join("out"),
    };

    let err = download_and_run(&ctx, "maas-scripts/").unwrap_err();

    assert!(matches!(err, remote_scripts::RunnerError::Reporting(_)));
    // TESTING was rejected, so nothing ran
    assert!(!ctx.out_dir.join("t").exists());
}
