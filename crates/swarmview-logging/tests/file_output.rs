//! File output goes through the global subscriber, so it gets its own test
//! binary.

use std::fs;

use swarmview_logging::{FileConfig, LogConfig, RotationStrategy, SwarmviewSubscriberBuilder};
use tempfile::TempDir;

#[test]
fn test_jsonl_file_output() {
    let dir = TempDir::new().unwrap();
    let guard = SwarmviewSubscriberBuilder::new()
        .with_config(LogConfig::default())
        .with_console(false)
        .with_file_output(FileConfig {
            directory: dir.path().to_path_buf(),
            prefix: "run".to_string(),
            rotation: RotationStrategy::Never,
            max_files: None,
        })
        .try_init()
        .unwrap()
        .expect("file output returns a guard");

    tracing::info!(target: "swarmview_cache", hash = "AAA", "Fetch complete");
    tracing::debug!(target: "swarmview_cache", "below the crate level");
    tracing::info!(target: "some_dependency", "below the base level");
    drop(guard);

    let contents = fs::read_to_string(dir.path().join("run.log")).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 1);

    let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["message"], "Fetch complete");
    assert_eq!(event["hash"], "AAA");
    assert_eq!(event["target"], "swarmview_cache");

    // A second install is refused
    assert!(SwarmviewSubscriberBuilder::new().try_init().is_err());
}
