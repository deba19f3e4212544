//! Configuration schema types.
//!
//! [`InstallConfig`] is the single parameter block for one provisioning run.
//! It is deserialized from YAML, completed with secrets from the environment
//! or prompts, validated, and then only ever handed out by reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::platform::PlatformKind;

/// Root configuration for an unattended database install.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    /// Target platform. Defaults to the host the tool runs on.
    #[serde(default)]
    pub platform: Option<PlatformKind>,

    /// Root of the vendor software tree (ORACLE_BASE).
    pub oracle_base: PathBuf,

    /// Software home directory (ORACLE_HOME).
    pub oracle_home: PathBuf,

    /// Central inventory location.
    pub inventory: PathBuf,

    /// Datafile location. Defaults to `<oracle_base>/oradata`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Working directory for generated response files.
    /// Defaults to `<oracle_base>/provision`.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Where the install media lives.
    pub source: SourceConfig,

    /// Database to create after the software install.
    pub database: DatabaseConfig,

    /// Edition to install.
    #[serde(default)]
    pub edition: Edition,

    /// OS account that owns the software.
    pub account: AccountConfig,

    /// Administrative database passwords.
    #[serde(default)]
    pub credentials: Credentials,

    /// Auto-start service registration.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Response-file template overrides.
    #[serde(default)]
    pub templates: TemplateOverrides,

    /// Per-process time limits.
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Write kernel parameter and shell limit fragments (Linux only).
    #[serde(default = "default_true")]
    pub tune_kernel: bool,
}

/// Install media location.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Directory (local or UNC) containing the archive.
    pub location: PathBuf,

    /// Archive file name inside `location`.
    pub archive: String,

    /// Expected SHA-256 of the archive, hex encoded.
    #[serde(default)]
    pub sha256: Option<String>,
}

impl SourceConfig {
    /// Full path to the archive.
    pub fn archive_path(&self) -> PathBuf {
        self.location.join(&self.archive)
    }
}

/// Database creation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Instance identifier.
    pub sid: String,

    /// Global database name. Defaults to the SID.
    #[serde(default)]
    pub global_name: Option<String>,

    /// Pluggable database to create inside the container, if any.
    #[serde(default)]
    pub pdb_name: Option<String>,

    /// Database character set.
    #[serde(default = "default_character_set")]
    pub character_set: String,

    /// National character set.
    #[serde(default = "default_national_character_set")]
    pub national_character_set: String,

    /// Share of physical memory given to the instance.
    #[serde(default = "default_memory_percentage")]
    pub memory_percentage: u8,

    /// Enable archive log mode.
    #[serde(default)]
    pub archivelog: bool,

    /// Install the sample schemas.
    #[serde(default)]
    pub sample_schema: bool,
}

impl DatabaseConfig {
    /// Global name, falling back to the SID.
    pub fn global_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.sid)
    }
}

/// Product edition.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Edition {
    #[default]
    Enterprise,
    Standard,
}

impl Edition {
    /// Code used by the installer response file.
    pub fn code(&self) -> &'static str {
        match self {
            Edition::Enterprise => "EE",
            Edition::Standard => "SE2",
        }
    }
}

/// Software owner account.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    /// Account name.
    pub name: String,

    /// Account password. May be supplied via `PROVISION_ACCOUNT_PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,

    /// Primary (install) group.
    #[serde(default = "default_primary_group")]
    pub primary_group: String,

    /// Administrative group.
    #[serde(default = "default_dba_group")]
    pub dba_group: String,

    /// Additional supplementary groups.
    #[serde(default)]
    pub extra_groups: Vec<String>,
}

impl AccountConfig {
    /// All groups, primary first, without duplicates.
    pub fn groups(&self) -> Vec<String> {
        let mut groups = vec![self.primary_group.clone()];
        for group in std::iter::once(&self.dba_group).chain(self.extra_groups.iter()) {
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }
        groups
    }
}

/// Administrative database passwords.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    /// SYS password. May be supplied via `PROVISION_SYS_PASSWORD`.
    #[serde(default)]
    pub sys_password: Option<String>,

    /// SYSTEM password. May be supplied via `PROVISION_SYSTEM_PASSWORD`.
    #[serde(default)]
    pub system_password: Option<String>,

    /// PDB administrator password. Falls back to the SYSTEM password.
    #[serde(default)]
    pub pdb_admin_password: Option<String>,
}

/// Auto-start service settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name. Defaults to `dbora` on Linux and `OracleService<SID>` on Windows.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether to register the service at all.
    #[serde(default = "default_true")]
    pub register: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            register: true,
        }
    }
}

/// Paths to caller-supplied response-file templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TemplateOverrides {
    /// Software-install response template.
    #[serde(default)]
    pub install_response: Option<PathBuf>,

    /// Database-creation response template.
    #[serde(default)]
    pub dbca_response: Option<PathBuf>,
}

/// Time limits for external processes, in seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Timeouts {
    /// Limit for the software installer.
    #[serde(default)]
    pub installer_secs: Option<u64>,

    /// Limit for database creation.
    #[serde(default)]
    pub dbca_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_character_set() -> String {
    "AL32UTF8".to_string()
}

fn default_national_character_set() -> String {
    "AL16UTF16".to_string()
}

fn default_memory_percentage() -> u8 {
    40
}

fn default_primary_group() -> String {
    "oinstall".to_string()
}

fn default_dba_group() -> String {
    "dba".to_string()
}

impl InstallConfig {
    /// Platform this config targets, falling back to the host.
    pub fn target_platform(&self) -> PlatformKind {
        self.platform.unwrap_or_else(PlatformKind::host)
    }

    /// Datafile directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| self.oracle_base.join("oradata"))
    }

    /// Directory for generated response files.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| self.oracle_base.join("provision"))
    }

    /// Service name for the target platform.
    pub fn service_name(&self) -> String {
        match &self.service.name {
            Some(name) => name.clone(),
            None => match self.target_platform() {
                PlatformKind::Linux => "dbora".to_string(),
                PlatformKind::Windows => format!("OracleService{}", self.database.sid),
            },
        }
    }

    /// PDB admin password, falling back to the SYSTEM password.
    pub fn pdb_admin_password(&self) -> Option<&str> {
        self.credentials
            .pdb_admin_password
            .as_deref()
            .or(self.credentials.system_password.as_deref())
    }

    /// Every secret value in this config, for output masking.
    pub fn secrets(&self) -> Vec<String> {
        [
            self.account.password.as_deref(),
            self.credentials.sys_password.as_deref(),
            self.credentials.system_password.as_deref(),
            self.credentials.pdb_admin_password.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
    }

    /// Placeholder bindings exposed to response-file templates.
    ///
    /// Missing passwords bind to an empty string; validation rejects configs
    /// without them before any template is rendered.
    pub fn template_bindings(&self) -> BTreeMap<String, String> {
        let db = &self.database;
        let mut bindings = BTreeMap::new();
        let mut bind = |key: &str, value: String| {
            bindings.insert(key.to_string(), value);
        };

        bind("oracle_base", display(&self.oracle_base));
        bind("oracle_home", display(&self.oracle_home));
        bind("inventory", display(&self.inventory));
        bind("data_dir", display(&self.data_dir()));
        bind("edition", self.edition.code().to_string());
        bind("os_user", self.account.name.clone());
        bind("install_group", self.account.primary_group.clone());
        bind("dba_group", self.account.dba_group.clone());
        bind(
            "account_password",
            self.account.password.clone().unwrap_or_default(),
        );
        bind("sid", db.sid.clone());
        bind("global_name", db.global_name().to_string());
        bind("create_as_cdb", db.pdb_name.is_some().to_string());
        bind("pdb_count", if db.pdb_name.is_some() { "1" } else { "0" }.into());
        bind("pdb_name", db.pdb_name.clone().unwrap_or_default());
        bind("character_set", db.character_set.clone());
        bind("national_character_set", db.national_character_set.clone());
        bind("memory_percentage", db.memory_percentage.to_string());
        bind("archivelog", db.archivelog.to_string());
        bind("sample_schema", db.sample_schema.to_string());
        bind(
            "sys_password",
            self.credentials.sys_password.clone().unwrap_or_default(),
        );
        bind(
            "system_password",
            self.credentials.system_password.clone().unwrap_or_default(),
        );
        bind(
            "pdb_admin_password",
            self.pdb_admin_password().unwrap_or_default().to_string(),
        );

        bindings
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
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
"#;

    #[test]
    fn minimal_config_applies_defaults() {
        let config: InstallConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.database.character_set, "AL32UTF8");
        assert_eq!(config.database.national_character_set, "AL16UTF16");
        assert_eq!(config.database.memory_percentage, 40);
        assert_eq!(config.account.primary_group, "oinstall");
        assert_eq!(config.edition, Edition::Enterprise);
        assert!(config.tune_kernel);
        assert!(config.service.register);
        assert_eq!(
            config.data_dir(),
            PathBuf::from("/u01/app/oracle").join("oradata")
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!("{}\nbogus: 1\n", MINIMAL);
        assert!(serde_yaml::from_str::<InstallConfig>(&yaml).is_err());
    }

    #[test]
    fn global_name_falls_back_to_sid() {
        let config: InstallConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.database.global_name(), "ORCL");
    }

    #[test]
    fn groups_put_primary_first_and_dedupe() {
        let account = AccountConfig {
            name: "oracle".into(),
            password: None,
            primary_group: "oinstall".into(),
            dba_group: "dba".into(),
            extra_groups: vec!["oper".into(), "dba".into()],
        };
        assert_eq!(account.groups(), vec!["oinstall", "dba", "oper"]);
    }

    #[test]
    fn service_name_defaults_per_platform() {
        let mut config: InstallConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.platform = Some(PlatformKind::Linux);
        assert_eq!(config.service_name(), "dbora");
        config.platform = Some(PlatformKind::Windows);
        assert_eq!(config.service_name(), "OracleServiceORCL");
    }

    #[test]
    fn edition_codes() {
        assert_eq!(Edition::Enterprise.code(), "EE");
        assert_eq!(Edition::Standard.code(), "SE2");
    }

    #[test]
    fn bindings_cover_database_fields() {
        let mut config: InstallConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.database.pdb_name = Some("ORCLPDB".into());
        config.credentials.system_password = Some("Manager123".into());
        let bindings = config.template_bindings();
        assert_eq!(bindings["sid"], "ORCL");
        assert_eq!(bindings["create_as_cdb"], "true");
        assert_eq!(bindings["pdb_name"], "ORCLPDB");
        assert_eq!(bindings["pdb_admin_password"], "Manager123");
        assert_eq!(bindings["edition"], "EE");
    }

    #[test]
    fn secrets_lists_only_present_values() {
        let mut config: InstallConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.account.password = Some("Welcome1x".into());
        config.credentials.sys_password = Some("SysPass1x".into());
        assert_eq!(config.secrets(), vec!["Welcome1x", "SysPass1x"]);
    }
}
