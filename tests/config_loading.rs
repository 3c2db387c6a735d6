// tests/config_loading.rs
//! Configuration files driving a full session

use bci_link_monitor::config::{ConfigError, ConfigLoader};
use bci_link_monitor::hal::SimulatedBoard;
use bci_link_monitor::session::{EndReason, MonitorSession};
use bci_link_monitor::tracking::ThresholdMode;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_file_and_env_layers_drive_session() {
    let dir = TempDir::new().expect("temp dir");
    let base = dir.path().join("default.toml");
    let local = dir.path().join("local.toml");

    fs::write(
        &base,
        r#"
[tracker]
bad_threshold = 2

[session]
max_samples = 2000

[simulator]
drop_every = 300
seed = 9
"#,
    )
    .expect("write base config");
    fs::write(&local, "[tracker]\nthreshold_mode = \"strict\"\n").expect("write local config");

    let loader = ConfigLoader::with_paths(vec![base, local]);
    let config = loader
        .load_with_env(vec![("BCIMON__TRACKER__BAD_THRESHOLD".to_string(), "3".to_string())])
        .expect("config loads");

    assert_eq!(config.tracker.bad_threshold, 3);
    assert_eq!(config.tracker.threshold_mode, ThresholdMode::Strict);

    let board = SimulatedBoard::new(config.simulator.clone()).expect("valid simulator");
    let report = MonitorSession::new(board, &config.tracker, config.session.clone())
        .expect("valid session")
        .run()
        .expect("session runs");

    // drops at 300, 600, 900, 1200: the fourth exceeds a strict threshold of 3
    assert_eq!(report.end_reason, EndReason::BadPacketThreshold);
    assert_eq!(report.summary.bad_count, 4);
}

#[test]
fn test_inconsistent_sections_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[session]\nsample_rate_hz = 500\n").expect("write config");

    let result = ConfigLoader::with_paths(vec![path]).load_with_env(Vec::new());
    match result {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("differs from session sample rate")));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}
