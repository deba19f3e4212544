//! Integration tests for the provision binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const VALID_CONFIG: &str = r#"
oracle_base: /u01/app/oracle
oracle_home: /u01/app/oracle/product/19.0.0/dbhome_1
inventory: /u01/app/oraInventory
source:
  location: /mnt/media
  archive: db_home.zip
database:
  sid: ORCL
account:
  name: oracle
  password: Welcome1x
credentials:
  sys_password: SysPass1x
  system_password: SysPass2x
"#;

const NO_SECRETS_CONFIG: &str = r#"
oracle_base: /u01/app/oracle
oracle_home: /u01/app/oracle/product/19.0.0/dbhome_1
inventory: /u01/app/oraInventory
source: { location: /mnt/media, archive: db_home.zip }
database: { sid: ORCL }
account: { name: oracle }
"#;

fn setup_project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("provision.yml"), config).unwrap();
    temp
}

/// The binary in a clean environment, never prompting.
fn provision(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("provision"));
    cmd.current_dir(temp.path())
        .env_remove("PROVISION_CONFIG")
        .env_remove("PROVISION_ACCOUNT_PASSWORD")
        .env_remove("PROVISION_SYS_PASSWORD")
        .env_remove("PROVISION_SYSTEM_PASSWORD")
        .env_remove("PROVISION_PDB_ADMIN_PASSWORD")
        .arg("--non-interactive");
    cmd
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("provision"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("unattended database installs"))
        .stdout(predicate::str::contains("validate"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("provision"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn validate_without_config_exits_2() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    provision(&temp)
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No configuration found"));
    Ok(())
}

#[test]
fn run_without_config_exits_2() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    provision(&temp)
        .args(["run", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No configuration found"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn validate_accepts_valid_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(VALID_CONFIG);
    provision(&temp)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid (ORCL on linux)"));
    Ok(())
}

#[test]
fn validate_lists_every_problem() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        &VALID_CONFIG
            .replace("sid: ORCL", "sid: 9LIVES")
            .replace("password: Welcome1x", "password: weak"),
    );
    provision(&temp)
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("problems"))
        .stdout(predicate::str::contains("database.sid"))
        .stdout(predicate::str::contains("account.password"));
    Ok(())
}

#[test]
fn missing_passwords_are_not_prompted_for() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(NO_SECRETS_CONFIG);
    provision(&temp)
        .arg("validate")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("PROVISION_ACCOUNT_PASSWORD"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn secrets_come_from_environment() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(NO_SECRETS_CONFIG);
    provision(&temp)
        .env("PROVISION_ACCOUNT_PASSWORD", "Welcome1x")
        .env("PROVISION_SYS_PASSWORD", "SysPass1x")
        .env("PROVISION_SYSTEM_PASSWORD", "SysPass2x")
        .arg("validate")
        .assert()
        .success();
    Ok(())
}

#[test]
fn config_path_from_environment() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let elsewhere = temp.path().join("conf/install.yml");
    provision(&temp)
        .env("PROVISION_CONFIG", &elsewhere)
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("install.yml"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn plan_lists_linux_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(VALID_CONFIG);
    provision(&temp)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. create-account"))
        .stdout(predicate::str::contains("run-root-script"))
        .stdout(predicate::str::contains("register-service"))
        .stdout(predicate::str::contains("SysPass1x").not());
    Ok(())
}

#[cfg(unix)]
#[test]
fn plan_for_windows_skips_root_scripts() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(VALID_CONFIG);
    provision(&temp)
        .args(["plan", "--platform", "windows"])
        .assert()
        .success()
        .stdout(predicate::str::contains("install-software"))
        .stdout(predicate::str::contains("run-root-script").not());
    Ok(())
}

#[cfg(unix)]
#[test]
fn bare_invocation_plans() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(VALID_CONFIG);
    provision(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("create-database"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_refuses_platform_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(&format!("platform: windows\n{}", VALID_CONFIG));
    provision(&temp)
        .args(["run", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot run on a linux host"));
    Ok(())
}

#[test]
fn schema_prints_json_schema() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    provision(&temp)
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"oracle_home\""))
        .stdout(predicate::str::contains("\"tune_kernel\""));
    Ok(())
}

#[test]
fn completions_for_bash() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    provision(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"));
    Ok(())
}
