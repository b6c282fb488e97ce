//! Record-replay integration tests.
//!
//! Per-port cassettes are written with `CassetteRecorder`, then a full
//! directory sync runs against `ServiceContext::replaying_dir` twice to
//! show the replay is complete and deterministic.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use campus_sync::cassette::config::CassetteConfig;
use campus_sync::cassette::recorder::CassetteRecorder;
use campus_sync::config::SyncSettings;
use campus_sync::context::ServiceContext;
use campus_sync::directory_sync::{self, RunOptions};

const REPORT: &str = "canvas_user_id,user_id,login_id,first_name,last_name,full_name,email,status\n\
    81,UID:4242,4242,Bo,Bbb,Bo Bbb,bo@example.edu,active\n";

fn write_cassette(dir: &Path, port: &str, interactions: Vec<(&str, Value)>) -> PathBuf {
    let path = dir.join(format!("{port}.cassette.yaml"));
    let mut recorder = CassetteRecorder::new(&path, format!("replay-test-{port}"));
    for (method, output) in interactions {
        recorder.record(port, method, json!({}), output);
    }
    recorder.finish().unwrap()
}

fn sync_cassettes(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    write_cassette(&dir, "clock", vec![("now", json!("2015-03-09T08:00:00Z"))]);
    write_cassette(&dir, "id_gen", vec![("generate_id", json!("run-7"))]);
    write_cassette(&dir, "directory", vec![("users_report", json!({ "Ok": REPORT }))]);
    write_cassette(&dir, "fs", vec![("write", json!({ "Ok": null }))]);
    write_cassette(
        &dir,
        "campus",
        vec![(
            "attributes_for_uids",
            json!({ "Ok": [{
                "ldap_uid": "4242",
                "first_name": "Bo",
                "last_name": "Bbb",
                "email": "bo@example.edu"
            }] }),
        )],
    );
    dir
}

#[test]
fn replayed_sync_is_deterministic() {
    let dir = sync_cassettes("campus_sync_replay_sync_test");
    let settings = SyncSettings { export_dir: "/stash".into(), ..SyncSettings::default() };

    let ctx = ServiceContext::replaying_dir(&dir).unwrap();
    let first = directory_sync::run(&ctx, &settings, &RunOptions::default()).unwrap();
    assert_eq!(first.run_id, "run-7");
    assert_eq!(first.accounts_examined, 1);
    assert_eq!(first.users_updated, 0);
    assert_eq!(first.sis_id_changes, 0);

    let ctx = ServiceContext::replaying_dir(&dir).unwrap();
    let second = directory_sync::run(&ctx, &settings, &RunOptions::default()).unwrap();
    assert_eq!(first, second);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replayed_errors_surface_as_errors() {
    let dir = std::env::temp_dir().join("campus_sync_replay_error_test");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let fs_path = write_cassette(&dir, "fs", vec![("read_to_string", json!({ "Err": "cannot read /in.csv: not found" }))]);

    let config = CassetteConfig { fs: Some(fs_path), ..CassetteConfig::default() };
    let ctx = ServiceContext::replaying_from(&config).unwrap();
    let err = ctx.fs.read_to_string(Path::new("/in.csv")).unwrap_err();
    assert!(err.to_string().contains("not found"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
#[should_panic(expected = "directory port not configured")]
fn ports_without_cassettes_panic_when_used() {
    let ctx = ServiceContext::replaying_from(&CassetteConfig::default()).unwrap();
    let _ = ctx.directory.users_report();
}
