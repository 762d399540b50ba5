use magpie_config::{AgentDetails, MagpieConfigLoader};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_a_full_agent_roster_from_file() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: 0.1
agents:
  - id: birdsite
    kind: twitter
    enabled: true
    concurrency: 2
    rate:
      qps: 1.0
      burst: 5
    config:
      bearer_token: "${TWITTER_BEARER_TOKEN}"
  - id: reddit
    kind: reddit
    enabled: true
    config:
      user_agent: "magpie-tests/0.0"
  - id: crawler
    kind: web
    config:
      max_depth: 3
      request_delay_ms: 250
storage:
  database_url: "sqlite://test.db"
  export_dir: "exports"
  "#;
    let p = write_yaml(&tmp, "magpie.yaml", file_yaml);

    let config = MagpieConfigLoader::new()
        .with_file(p)
        .load()
        .expect("load system config");

    assert_eq!(config.agents.len(), 3);
    assert_eq!(config.storage.database_url, "sqlite://test.db");

    let crawler = config
        .agents
        .iter()
        .find(|a| a.id == "crawler")
        .expect("crawler spec present");
    match &crawler.details {
        AgentDetails::Web { config } => {
            assert_eq!(config.max_depth, 3);
            assert_eq!(config.request_delay_ms, 250);
            // Untouched fields keep their defaults.
            assert_eq!(config.max_pages_per_domain, 100);
        }
        other => panic!("expected web agent, got {other:?}"),
    }
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "magpie.yaml",
        "version: '1'\nagents: []\nstorage:\n  export_dir: from-file\n",
    );

    temp_env::with_var("MAGPIE__STORAGE__EXPORT_DIR", Some("from-env"), || {
        let config = MagpieConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load system config");
        assert_eq!(config.storage.export_dir.to_str(), Some("from-env"));
    });
}

#[test]
#[serial]
fn optional_file_may_be_absent() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.yaml");

    let config = MagpieConfigLoader::new()
        .with_optional_file(&missing)
        .with_yaml_str("agents: []")
        .load()
        .expect("absent optional file is not an error");
    assert!(config.agents.is_empty());
}
