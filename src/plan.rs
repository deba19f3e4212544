//! The standard install sequence.
//!
//! [`build`] turns an [`InstallConfig`] into the ordered step list for one
//! platform. Everything platform-specific about the *sequence* lives here;
//! everything platform-specific about *how* a step mutates the host lives
//! behind [`PlatformAdapter`](crate::platform::PlatformAdapter).
//!
//! Linux:
//!
//! 1. software owner and groups
//! 2. directory layout, handed to the owner
//! 3. shell limits and kernel parameters (when `tune_kernel`)
//! 4. install media, unpacked into the home and handed to the owner
//! 5. install response file, environment, installer
//! 6. `orainstRoot.sh` and `root.sh`
//! 7. database creation response file and assistant
//! 8. auto-start service
//!
//! Windows follows the same order without the kernel and root-script steps,
//! and sets machine-wide environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::response::{
    DBCA_RESPONSE, INSTALL_RESPONSE, LIMITS_CONF, SYSCTL_CONF, WINDOWS_INSTALL_RESPONSE,
};
use crate::config::{builtin_template, load_template, placeholders, InstallConfig};
use crate::error::{ProvisionError, Result};
use crate::platform::{AccessGrant, EnvScope, PlatformKind, Principal, ServiceDefinition};
use crate::shell::Invocation;
use crate::steps::{
    EnsureDirectory, EnsureUser, ExtractArchive, RegisterService, RenderTemplate,
    RunExternalProcess, SetPermissions, SetPersistentEnvVar, Step, DEFAULT_MARKER,
};

/// icacls rights granting full control, inherited by files and folders.
const FULL_CONTROL: &str = "(OI)(CI)F";

/// Host files the Linux sequence writes or uses as completion guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    /// Directory for the shell limits fragment.
    pub limits_dir: PathBuf,
    /// Directory for the kernel parameter fragment.
    pub sysctl_dir: PathBuf,
    /// Written by `orainstRoot.sh`.
    pub ora_inst_loc: PathBuf,
    /// Written by `root.sh`.
    pub oratab: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            limits_dir: PathBuf::from("/etc/security/limits.d"),
            sysctl_dir: PathBuf::from("/etc/sysctl.d"),
            ora_inst_loc: PathBuf::from("/etc/oraInst.loc"),
            oratab: PathBuf::from("/etc/oratab"),
        }
    }
}

impl SystemPaths {
    /// The same layout below `root` instead of `/`.
    pub fn under(root: &Path) -> Self {
        Self {
            limits_dir: root.join("etc/security/limits.d"),
            sysctl_dir: root.join("etc/sysctl.d"),
            ora_inst_loc: root.join("etc/oraInst.loc"),
            oratab: root.join("etc/oratab"),
        }
    }
}

/// Build the install sequence for `kind` using the host's system paths.
///
/// # Errors
///
/// Fails when a template override is missing or any template is malformed.
pub fn build(config: &InstallConfig, kind: PlatformKind) -> Result<Vec<Box<dyn Step>>> {
    build_with(config, kind, &SystemPaths::default())
}

/// Build the install sequence for `kind`.
pub fn build_with(
    config: &InstallConfig,
    kind: PlatformKind,
    system: &SystemPaths,
) -> Result<Vec<Box<dyn Step>>> {
    let planner = Planner::new(config, kind);
    let steps = match kind {
        PlatformKind::Linux => planner.linux(system)?,
        PlatformKind::Windows => planner.windows()?,
    };
    tracing::debug!("Planned {} steps for {}", steps.len(), kind);
    Ok(steps)
}

struct Planner<'a> {
    config: &'a InstallConfig,
    kind: PlatformKind,
    owner: Principal,
    staging: PathBuf,
}

impl<'a> Planner<'a> {
    fn new(config: &'a InstallConfig, kind: PlatformKind) -> Self {
        let account = &config.account;
        Self {
            config,
            kind,
            owner: Principal::new(account.name.clone()).with_groups(account.groups()),
            staging: config.staging_dir(),
        }
    }

    fn linux(&self, system: &SystemPaths) -> Result<Vec<Box<dyn Step>>> {
        let config = self.config;
        let account = &config.account.name;

        let mut steps: Vec<Box<dyn Step>> = vec![
            Box::new(self.ensure_user()),
            Box::new(self.ensure_directories()),
            Box::new(self.own(&config.oracle_base, "own-oracle-base", false)),
            Box::new(self.own(&config.inventory, "own-inventory", false)),
            Box::new(self.own(&config.data_dir(), "own-data-dir", true)),
            Box::new(self.own(&self.staging, "own-staging-dir", true)),
        ];

        if config.tune_kernel {
            let limits = system
                .limits_dir
                .join(format!("99-provision-{}.conf", account));
            let sysctl = system.sysctl_dir.join("99-provision.conf");
            steps.push(Box::new(
                RenderTemplate::new(self.builtin(LIMITS_CONF)?, config.template_bindings(), limits)
                    .named("shell-limits"),
            ));
            steps.push(Box::new(
                RenderTemplate::new(self.builtin(SYSCTL_CONF)?, config.template_bindings(), sysctl)
                    .named("kernel-parameters"),
            ));
            steps.push(Box::new(
                RunExternalProcess::new(Invocation::new("sysctl").arg("--system"))
                    .named("apply-kernel-parameters"),
            ));
        }

        steps.push(Box::new(self.extract()));
        steps.push(Box::new(self.install_response(INSTALL_RESPONSE)?));
        steps.extend(self.environment(EnvScope::User(account.clone())));
        steps.push(Box::new(
            self.installer("runInstaller").run_as(self.owner.clone()),
        ));
        steps.push(Box::new(
            RunExternalProcess::new(Invocation::new(config.inventory.join("orainstRoot.sh")))
                .skip_if_exists(&system.ora_inst_loc)
                .named("run-orainstroot"),
        ));
        steps.push(Box::new(
            RunExternalProcess::new(Invocation::new(config.oracle_home.join("root.sh")))
                .skip_if_exists(&system.oratab)
                .named("run-root-script"),
        ));
        steps.push(Box::new(self.dbca_response()?));
        steps.push(Box::new(
            self.dbca(config.oracle_home.join("bin").join("dbca"))
                .run_as(self.owner.clone()),
        ));

        if config.service.register {
            let home = config.oracle_home.display().to_string();
            let bin = config.oracle_home.join("bin");
            steps.push(Box::new(self.service(ServiceDefinition {
                name: config.service_name(),
                description: format!("Oracle Database {}", config.database.sid),
                start: Invocation::new(bin.join("dbstart")).arg(home.clone()),
                stop: Some(Invocation::new(bin.join("dbshut")).arg(home)),
                run_as: Some(self.owner.clone()),
                working_dir: Some(config.oracle_home.clone()),
            })));
        }

        Ok(steps)
    }

    fn windows(&self) -> Result<Vec<Box<dyn Step>>> {
        let config = self.config;
        let mut steps: Vec<Box<dyn Step>> = vec![
            Box::new(self.ensure_user()),
            Box::new(self.ensure_directories()),
            Box::new(self.own(&config.oracle_base, "own-oracle-base", true)),
            Box::new(self.own(&config.inventory, "own-inventory", true)),
            Box::new(self.extract()),
            Box::new(self.install_response(WINDOWS_INSTALL_RESPONSE)?),
        ];
        steps.extend(self.environment(EnvScope::Machine));
        steps.push(Box::new(self.installer("setup.exe")));
        steps.push(Box::new(self.dbca_response()?));
        steps.push(Box::new(
            self.dbca(config.oracle_home.join("bin").join("dbca.bat")),
        ));

        if config.service.register {
            let sid = config.database.sid.clone();
            steps.push(Box::new(self.service(ServiceDefinition {
                name: config.service_name(),
                description: format!("Oracle Database {}", sid),
                start: Invocation::new(config.oracle_home.join("bin").join("ORACLE.EXE"))
                    .arg(sid),
                stop: None,
                run_as: None,
                working_dir: None,
            })));
        }
        Ok(steps)
    }

    fn ensure_user(&self) -> EnsureUser {
        let account = &self.config.account;
        EnsureUser::new(account.name.clone(), account.password.clone(), account.groups())
            .named("create-account")
    }

    fn ensure_directories(&self) -> EnsureDirectory {
        let config = self.config;
        EnsureDirectory::new(vec![
            config.oracle_base.clone(),
            config.oracle_home.clone(),
            config.inventory.clone(),
            config.data_dir(),
            self.staging.clone(),
        ])
        .named("create-directories")
    }

    /// Ownership for the software owner: group and mode on Linux, icacls
    /// rights on Windows.
    fn owner_grant(&self) -> AccessGrant {
        let account = &self.config.account;
        match self.kind {
            PlatformKind::Linux => {
                AccessGrant::owner(account.name.clone()).group(account.primary_group.clone())
            }
            PlatformKind::Windows => AccessGrant::owner(account.name.clone()).rights(FULL_CONTROL),
        }
    }

    /// Hand a directory to the software owner. Non-recursive Linux grants
    /// also set mode 775.
    fn own(&self, path: &Path, step: &str, recursive: bool) -> SetPermissions {
        let grant = match self.kind {
            PlatformKind::Linux if !recursive => self.owner_grant().mode(0o775),
            _ => self.owner_grant(),
        };
        SetPermissions::new(path, grant.recursive(recursive)).named(step)
    }

    fn extract(&self) -> ExtractArchive {
        let source = &self.config.source;
        ExtractArchive::new(source.archive_path(), &self.config.oracle_home)
            .with_marker(DEFAULT_MARKER)
            .with_sha256(source.sha256.clone())
            .owned_by(self.owner_grant())
            .named("extract-software")
    }

    fn install_response(&self, builtin: &str) -> Result<RenderTemplate> {
        let text = load_template(self.config.templates.install_response.as_deref(), builtin)?;
        self.response(text, INSTALL_RESPONSE, "install-response-file")
    }

    fn dbca_response(&self) -> Result<RenderTemplate> {
        let text = load_template(self.config.templates.dbca_response.as_deref(), DBCA_RESPONSE)?;
        self.response(text, DBCA_RESPONSE, "dbca-response-file")
    }

    /// A response file in the staging directory, owner-only when it binds a
    /// password.
    fn response(&self, text: String, file_name: &str, step: &str) -> Result<RenderTemplate> {
        let secret = placeholders(&text)?
            .iter()
            .any(|name| name.ends_with("password"));
        Ok(RenderTemplate::new(
            text,
            self.config.template_bindings(),
            self.staging.join(file_name),
        )
        .secret(secret)
        .response_file(true)
        .owned_by(self.config.account.name.clone())
        .named(step))
    }

    fn environment(&self, scope: EnvScope) -> Vec<Box<dyn Step>> {
        let config = self.config;
        [
            ("ORACLE_BASE", config.oracle_base.display().to_string()),
            ("ORACLE_HOME", config.oracle_home.display().to_string()),
            ("ORACLE_SID", config.database.sid.clone()),
        ]
        .into_iter()
        .map(|(name, value)| {
            Box::new(
                SetPersistentEnvVar::new(name, value, scope.clone())
                    .named(format!("env-{}", name.to_lowercase().replace('_', "-"))),
            ) as Box<dyn Step>
        })
        .collect()
    }

    fn installer(&self, program: &str) -> RunExternalProcess {
        let config = self.config;
        let invocation = Invocation::new(config.oracle_home.join(program))
            .args(["-silent", "-waitforcompletion", "-responseFile"])
            .arg(self.staging.join(INSTALL_RESPONSE).display().to_string())
            .env("ORACLE_BASE", config.oracle_base.display().to_string())
            .env("ORACLE_HOME", config.oracle_home.display().to_string())
            .current_dir(&config.oracle_home);
        RunExternalProcess::new(invocation)
            .timeout(config.timeouts.installer_secs.map(Duration::from_secs))
            .skip_if_exists(config.inventory.join("ContentsXML").join("inventory.xml"))
            .named("install-software")
    }

    fn dbca(&self, program: PathBuf) -> RunExternalProcess {
        let config = self.config;
        let invocation = Invocation::new(program)
            .args(["-silent", "-createDatabase", "-responseFile"])
            .arg(self.staging.join(DBCA_RESPONSE).display().to_string())
            .env("ORACLE_BASE", config.oracle_base.display().to_string())
            .env("ORACLE_HOME", config.oracle_home.display().to_string())
            .env("ORACLE_SID", config.database.sid.clone());
        RunExternalProcess::new(invocation)
            .timeout(config.timeouts.dbca_secs.map(Duration::from_secs))
            .skip_if_exists(config.data_dir().join(&config.database.sid))
            .named("create-database")
    }

    fn service(&self, definition: ServiceDefinition) -> RegisterService {
        RegisterService::new(definition).named("register-service")
    }

    fn builtin(&self, name: &str) -> Result<String> {
        builtin_template(name)
            .map(str::to_string)
            .ok_or_else(|| {
                ProvisionError::configuration(format!("no built-in template named '{}'", name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::sample_config;

    fn names(steps: &[Box<dyn Step>]) -> Vec<String> {
        steps.iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn linux_sequence_order() {
        let config = sample_config();
        let steps = build(&config, PlatformKind::Linux).unwrap();
        assert_eq!(
            names(&steps),
            vec![
                "create-account",
                "create-directories",
                "own-oracle-base",
                "own-inventory",
                "own-data-dir",
                "own-staging-dir",
                "extract-software",
                "install-response-file",
                "env-oracle-base",
                "env-oracle-home",
                "env-oracle-sid",
                "install-software",
                "run-orainstroot",
                "run-root-script",
                "dbca-response-file",
                "create-database",
                "register-service",
            ]
        );
    }

    #[test]
    fn kernel_tuning_adds_fragments() {
        let mut config = sample_config();
        config.tune_kernel = true;
        let system = SystemPaths::under(Path::new("/tmp/root"));
        let steps = build_with(&config, PlatformKind::Linux, &system).unwrap();
        let names = names(&steps);

        let limits = names.iter().position(|n| n == "shell-limits").unwrap();
        let extract = names.iter().position(|n| n == "extract-software").unwrap();
        assert!(limits < extract);
        assert!(names.contains(&"kernel-parameters".to_string()));
        assert!(names.contains(&"apply-kernel-parameters".to_string()));
    }

    #[test]
    fn windows_sequence_skips_linux_only_steps() {
        let config = sample_config();
        let steps = build(&config, PlatformKind::Windows).unwrap();
        let names = names(&steps);
        assert!(!names.iter().any(|n| n.starts_with("run-")));
        assert!(!names.contains(&"shell-limits".to_string()));
        assert_eq!(names.last().map(String::as_str), Some("register-service"));
        assert!(steps
            .iter()
            .any(|s| s.describe().contains("setup.exe")));
    }

    #[test]
    fn service_registration_can_be_disabled() {
        let mut config = sample_config();
        config.service.register = false;
        let steps = build(&config, PlatformKind::Linux).unwrap();
        assert!(!names(&steps).contains(&"register-service".to_string()));
    }

    #[test]
    fn environment_scope_follows_platform() {
        let config = sample_config();
        let linux = build(&config, PlatformKind::Linux).unwrap();
        let windows = build(&config, PlatformKind::Windows).unwrap();

        let describe = |steps: &[Box<dyn Step>]| {
            steps
                .iter()
                .find(|s| s.name() == "env-oracle-sid")
                .map(|s| s.describe())
                .unwrap()
        };
        assert_eq!(describe(&linux), "Set ORACLE_SID=ORCL (user oracle)");
        assert_eq!(describe(&windows), "Set ORACLE_SID=ORCL (machine)");
    }

    #[test]
    fn installer_uses_silent_flags() {
        let config = sample_config();
        let steps = build(&config, PlatformKind::Linux).unwrap();
        let installer = steps
            .iter()
            .find(|s| s.name() == "install-software")
            .unwrap()
            .describe();
        assert!(installer.contains("runInstaller -silent -waitforcompletion -responseFile"));
        assert!(installer.contains("db_install.rsp"));
        assert!(installer.ends_with("as oracle"));
    }

    #[test]
    fn dbca_response_is_owner_only() {
        let config = sample_config();
        let steps = build(&config, PlatformKind::Linux).unwrap();
        let find = |name: &str| {
            steps
                .iter()
                .find(|s| s.name() == name)
                .map(|s| s.describe())
                .unwrap()
        };
        assert!(find("dbca-response-file").ends_with("(owner-only)"));
        assert!(!find("install-response-file").ends_with("(owner-only)"));
    }

    #[test]
    fn missing_override_template_fails_the_plan() {
        let mut config = sample_config();
        config.templates.dbca_response = Some("/nonexistent/dbca.rsp".into());
        let err = build(&config, PlatformKind::Linux).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
