//! Shared fixtures for unit tests.

use std::path::Path;

use crate::config::{
    AccountConfig, Credentials, DatabaseConfig, Edition, InstallConfig, ServiceConfig,
    SourceConfig, TemplateOverrides, Timeouts,
};

/// A valid config using the conventional install layout.
pub(crate) fn sample_config() -> InstallConfig {
    InstallConfig {
        platform: None,
        oracle_base: "/u01/app/oracle".into(),
        oracle_home: "/u01/app/oracle/product/19.0.0/dbhome_1".into(),
        inventory: "/u01/app/oraInventory".into(),
        data_dir: None,
        staging_dir: None,
        source: SourceConfig {
            location: "/mnt/media".into(),
            archive: "db_home.zip".into(),
            sha256: None,
        },
        database: DatabaseConfig {
            sid: "ORCL".into(),
            global_name: None,
            pdb_name: None,
            character_set: "AL32UTF8".into(),
            national_character_set: "AL16UTF16".into(),
            memory_percentage: 40,
            archivelog: false,
            sample_schema: false,
        },
        edition: Edition::Enterprise,
        account: AccountConfig {
            name: "oracle".into(),
            password: Some("Welcome1x".into()),
            primary_group: "oinstall".into(),
            dba_group: "dba".into(),
            extra_groups: Vec::new(),
        },
        credentials: Credentials {
            sys_password: Some("SysPass1x".into()),
            system_password: Some("SysPass2x".into()),
            pdb_admin_password: None,
        },
        service: ServiceConfig::default(),
        templates: TemplateOverrides::default(),
        timeouts: Timeouts::default(),
        tune_kernel: false,
    }
}

/// [`sample_config`] with every path under `root`.
pub(crate) fn config_under(root: &Path) -> InstallConfig {
    let base = root.join("app/oracle");
    InstallConfig {
        oracle_home: base.join("product/19.0.0/dbhome_1"),
        oracle_base: base,
        inventory: root.join("app/oraInventory"),
        source: SourceConfig {
            location: root.join("media"),
            archive: "db_home.zip".into(),
            sha256: None,
        },
        ..sample_config()
    }
}
