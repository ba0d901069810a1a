use evs_config::{ConfigManager, ENV_OVERRIDES};
use evs_core::error::EvsError;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SAMPLE_CONFIG: &str = r#"
aws:
  region: us-west-2
  profile: migration
vmware:
  vcenter_server: vcenter.corp.example.com
  username: administrator@vsphere.local
  password: file-secret
  port: 8443
  ssl_verify: false
evs:
  default_cluster_name: prod-cluster
  environment: production
  instance_type: i4i.metal
  node_count: 4
security:
  kms_key_id: arn:aws:kms:us-west-2:111122223333:key/abcd
monitoring:
  period_secs: 60
migration:
  s3_bucket: corp-vm-imports
  s3_prefix: imports/
  export_path: /var/tmp/ovf
  import_timeout_secs: 600
tags:
  Project: dc-exit
  Owner: platform
"#;

/// Test fixture that writes a config file into a temporary directory
struct ConfigFixture {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new(contents: &str) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config_dir = temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("create config dir");
        let config_path = config_dir.join("config.yaml");
        fs::write(&config_path, contents).expect("write config");
        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }
}

fn clear_overrides() {
    for key in ENV_OVERRIDES {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn loads_every_section_from_file() {
    clear_overrides();
    let fixture = ConfigFixture::new(SAMPLE_CONFIG);
    let manager = ConfigManager::load(Some(&fixture.config_path)).expect("config should load");

    assert_eq!(manager.path(), fixture.config_path.as_path());
    assert_eq!(manager.aws().profile.as_deref(), Some("migration"));
    assert_eq!(manager.vmware().port, 8443);
    assert!(!manager.vmware().ssl_verify);
    assert_eq!(manager.evs().environment, "production");
    assert_eq!(manager.evs().node_count, 4);
    assert!(manager.security().encrypt_uploads);
    assert!(manager.security().kms_key_id.is_some());
    assert_eq!(manager.monitoring().period_secs, 60);
    assert_eq!(manager.monitoring().metric_name, "ClusterHealth");
    assert_eq!(manager.migration().s3_bucket.as_deref(), Some("corp-vm-imports"));
    assert_eq!(manager.migration().import_timeout().as_secs(), 600);
    assert_eq!(manager.tags().get("Project").map(String::as_str), Some("dc-exit"));
}

#[test]
#[serial]
fn environment_beats_file() {
    clear_overrides();
    let fixture = ConfigFixture::new(SAMPLE_CONFIG);
    std::env::set_var("AWS_REGION", "eu-west-1");
    std::env::set_var("AWS_PROFILE", "ci");
    std::env::set_var("VCENTER_SERVER", "vc2.corp.example.com");
    std::env::set_var("VCENTER_USERNAME", "svc-migrate");
    std::env::set_var("VCENTER_PASSWORD", "env-secret");
    std::env::set_var("EVS_CLUSTER_NAME", "staging-cluster");

    let result = ConfigManager::load(Some(&fixture.config_path));
    clear_overrides();
    let manager = result.expect("config should load");

    assert_eq!(manager.aws().region, "eu-west-1");
    assert_eq!(manager.aws().profile.as_deref(), Some("ci"));
    assert_eq!(manager.vmware().vcenter_server.as_deref(), Some("vc2.corp.example.com"));
    assert_eq!(manager.vmware().username.as_deref(), Some("svc-migrate"));
    assert_eq!(manager.vmware().password.as_deref(), Some("env-secret"));
    assert_eq!(manager.evs().default_cluster_name.as_deref(), Some("staging-cluster"));
    // Untouched values survive.
    assert_eq!(manager.vmware().port, 8443);
}

#[test]
#[serial]
fn missing_file_is_config_error() {
    clear_overrides();
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.yaml");

    match ConfigManager::load(Some(&missing)) {
        Err(EvsError::Config(msg)) => assert!(msg.contains("not found"), "{}", msg),
        other => panic!("expected config error, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[serial]
fn invalid_region_from_env_is_rejected() {
    clear_overrides();
    let fixture = ConfigFixture::new("aws:\n  region: us-west-2\n");
    std::env::set_var("AWS_REGION", "not a region");
    let result = ConfigManager::load(Some(&fixture.config_path));
    clear_overrides();

    assert!(matches!(result, Err(EvsError::Config(_))));
}

#[test]
#[serial]
fn unknown_sections_are_ignored() {
    clear_overrides();
    let fixture = ConfigFixture::new("logging:\n  level: debug\naws:\n  region: ap-south-1\n");
    let manager = ConfigManager::load(Some(&fixture.config_path)).unwrap();
    assert_eq!(manager.aws().region, "ap-south-1");
}
