//! Configuration file loading.
//!
//! Loads an [`InstallConfig`] from YAML, then overlays secrets supplied
//! through the environment so passwords can stay out of the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::InstallConfig;
use crate::error::{ProvisionError, Result};

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "provision.yml";

/// Env var carrying the software owner's password.
pub const ENV_ACCOUNT_PASSWORD: &str = "PROVISION_ACCOUNT_PASSWORD";
/// Env var carrying the SYS password.
pub const ENV_SYS_PASSWORD: &str = "PROVISION_SYS_PASSWORD";
/// Env var carrying the SYSTEM password.
pub const ENV_SYSTEM_PASSWORD: &str = "PROVISION_SYSTEM_PASSWORD";
/// Env var carrying the PDB administrator password.
pub const ENV_PDB_ADMIN_PASSWORD: &str = "PROVISION_PDB_ADMIN_PASSWORD";

/// Resolve the config path: explicit path, or `provision.yml` under `root`.
pub fn resolve_config_path(explicit: Option<&Path>, root: &Path) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => root.join(path),
        None => root.join(DEFAULT_CONFIG_FILE),
    }
}

/// Parse configuration from a YAML string.
pub fn parse_config(content: &str, path: &Path) -> Result<InstallConfig> {
    serde_yaml::from_str(content).map_err(|e| ProvisionError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a config file from disk.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file does not exist and `ConfigParse`
/// if it is not a valid config document.
pub fn load_config_file(path: &Path) -> Result<InstallConfig> {
    if !path.exists() {
        return Err(ProvisionError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| ProvisionError::io(path, e))?;
    parse_config(&content, path)
}

/// Overlay secrets from environment variables. Non-empty env values win.
pub fn apply_env_secrets(mut config: InstallConfig, env: &HashMap<String, String>) -> InstallConfig {
    let lookup = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

    if let Some(value) = lookup(ENV_ACCOUNT_PASSWORD) {
        config.account.password = Some(value);
    }
    if let Some(value) = lookup(ENV_SYS_PASSWORD) {
        config.credentials.sys_password = Some(value);
    }
    if let Some(value) = lookup(ENV_SYSTEM_PASSWORD) {
        config.credentials.system_password = Some(value);
    }
    if let Some(value) = lookup(ENV_PDB_ADMIN_PASSWORD) {
        config.credentials.pdb_admin_password = Some(value);
    }
    config
}

/// Load a config file and overlay secrets from the process environment.
pub fn load_config(path: &Path) -> Result<InstallConfig> {
    let config = load_config_file(path)?;
    let env: HashMap<String, String> = std::env::vars()
        .filter(|(k, _)| k.starts_with("PROVISION_"))
        .collect();
    tracing::debug!("Loaded config from {}", path.display());
    Ok(apply_env_secrets(config, &env))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
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
  password: FromFile1
"#;

    #[test]
    fn load_config_file_reads_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("provision.yml");
        fs::write(&path, CONFIG).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.database.sid, "ORCL");
        assert_eq!(config.account.password.as_deref(), Some("FromFile1"));
    }

    #[test]
    fn load_config_file_missing_is_config_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config_file(&temp.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, ProvisionError::ConfigNotFound { .. }));
    }

    #[test]
    fn load_config_file_invalid_yaml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("provision.yml");
        fs::write(&path, "oracle_base: [unclosed").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ProvisionError::ConfigParse { .. }));
        assert!(err.to_string().contains("provision.yml"));
    }

    #[test]
    fn env_secrets_override_file_values() {
        let config = parse_config(CONFIG, Path::new("provision.yml")).unwrap();
        let mut env = HashMap::new();
        env.insert(ENV_ACCOUNT_PASSWORD.to_string(), "FromEnv1".to_string());
        env.insert(ENV_SYS_PASSWORD.to_string(), "SysEnv1x".to_string());
        env.insert(ENV_SYSTEM_PASSWORD.to_string(), String::new());

        let config = apply_env_secrets(config, &env);
        assert_eq!(config.account.password.as_deref(), Some("FromEnv1"));
        assert_eq!(config.credentials.sys_password.as_deref(), Some("SysEnv1x"));
        assert_eq!(config.credentials.system_password, None);
    }

    #[test]
    fn resolve_config_path_defaults_to_root_file() {
        let root = Path::new("/srv");
        assert_eq!(
            resolve_config_path(None, root),
            PathBuf::from("/srv").join(DEFAULT_CONFIG_FILE)
        );
        assert_eq!(
            resolve_config_path(Some(Path::new("other.yml")), root),
            PathBuf::from("/srv").join("other.yml")
        );
    }
}
