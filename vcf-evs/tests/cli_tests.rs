use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const OVERRIDES: [&str; 10] = [
    "AWS_REGION",
    "AWS_PROFILE",
    "VCENTER_SERVER",
    "VCENTER_USERNAME",
    "VCENTER_PASSWORD",
    "EVS_CLUSTER_NAME",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "LOG_OUTPUT",
    "LOG_FILE",
];

/// Config without any vCenter credentials.
const AWS_ONLY_CONFIG: &str = r#"
aws:
  region: us-west-2
evs:
  instance_type: i4i.metal
  node_count: 3
migration:
  s3_bucket: corp-vm-imports
"#;

fn bin(name: &str, workdir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin(name));
    cmd.current_dir(workdir.path());
    for key in OVERRIDES {
        cmd.env_remove(key);
    }
    cmd
}

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn help_lists_commands() {
    let dir = tempdir().unwrap();
    bin("vcf-evs", &dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("rollback"));
}

#[test]
fn missing_config_exits_with_hint() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.yaml");
    bin("vcf-evs", &dir)
        .arg("-c")
        .arg(&missing)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("or pass --config <FILE>"));
}

#[test]
fn default_config_path_is_relative_to_workdir() {
    let dir = tempdir().unwrap();
    bin("vcf-evs", &dir)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config/config.yaml"));
}

#[test]
fn invalid_region_is_rejected() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, "aws:\n  region: mars-1\n");
    bin("vcf-evs", &dir)
        .arg("-c")
        .arg(&config)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("aws.region 'mars-1' is not a valid AWS region"));
}

#[test]
fn vms_without_vcenter_credentials_fails() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, AWS_ONLY_CONFIG);
    bin("vcf-evs", &dir)
        .arg("-c")
        .arg(&config)
        .arg("vms")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "vcenter_server, username, and password are required",
        ));
}

#[test]
fn migrate_without_vcenter_credentials_reports_failure() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, AWS_ONLY_CONFIG);
    bin("vcf-evs", &dir)
        .args(["migrate", "--source", "web01", "--target", "prod-cluster", "-c"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Migrating 'web01'"))
        .stderr(predicate::str::contains("Migration of 'web01' failed"));
}

#[test]
fn create_requires_a_name() {
    let dir = tempdir().unwrap();
    bin("vcf-evs", &dir)
        .args(["create", "--size", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name"));
}

#[test]
fn migrate_vm_requires_target_cluster() {
    let dir = tempdir().unwrap();
    bin("migrate-vm", &dir)
        .args(["--vm-name", "web01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--target-cluster"));
}

#[test]
fn migrate_vm_rollback_does_not_need_target_cluster() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, AWS_ONLY_CONFIG);
    bin("migrate-vm", &dir)
        .args(["--vm-name", "web01", "--rollback", "snapshot-1", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to set up the migrator"));
}

#[test]
fn migrate_vm_reports_missing_config() {
    let dir = tempdir().unwrap();
    bin("migrate-vm", &dir)
        .args(["--vm-name", "web01", "--target-cluster", "prod-cluster"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"));
}
