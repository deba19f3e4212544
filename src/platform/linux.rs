//! Linux adapter.
//!
//! Accounts are looked up in the passwd/group databases and created with
//! the shadow-utils tools. Persistent environment lives in shell profile
//! fragments and services are systemd units.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};
use crate::platform::{
    admin_command, AccessGrant, EnvScope, PlatformAdapter, PlatformKind, Principal,
    ServiceDefinition,
};
use crate::shell::{self, Invocation};

/// Target that `systemctl enable` links auto-start units into.
const BOOT_TARGET: &str = "multi-user.target";

/// Filesystem locations the adapter reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxPaths {
    pub passwd: PathBuf,
    pub group: PathBuf,
    pub profile_d: PathBuf,
    pub systemd_units: PathBuf,
}

impl Default for LinuxPaths {
    fn default() -> Self {
        Self {
            passwd: PathBuf::from("/etc/passwd"),
            group: PathBuf::from("/etc/group"),
            profile_d: PathBuf::from("/etc/profile.d"),
            systemd_units: PathBuf::from("/etc/systemd/system"),
        }
    }
}

impl LinuxPaths {
    /// All locations under `root`, for tests.
    pub fn under(root: &Path) -> Self {
        Self {
            passwd: root.join("etc/passwd"),
            group: root.join("etc/group"),
            profile_d: root.join("etc/profile.d"),
            systemd_units: root.join("etc/systemd/system"),
        }
    }
}

/// [`PlatformAdapter`] for Linux hosts.
#[derive(Debug, Clone, Default)]
pub struct LinuxAdapter {
    paths: LinuxPaths,
}

impl LinuxAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(paths: LinuxPaths) -> Self {
        Self { paths }
    }

    /// Home directory of `name` from the passwd database.
    pub fn home_dir(&self, name: &str) -> Result<Option<PathBuf>> {
        Ok(read_db(&self.paths.passwd)?
            .iter()
            .find(|fields| fields.first().map(String::as_str) == Some(name))
            .and_then(|fields| fields.get(5))
            .map(PathBuf::from))
    }

    /// Numeric uid and primary gid of `name` from the passwd database.
    fn account_ids(&self, name: &str) -> Result<Option<(u32, u32)>> {
        Ok(read_db(&self.paths.passwd)?
            .iter()
            .find(|fields| fields.first().map(String::as_str) == Some(name))
            .and_then(|fields| {
                let uid = fields.get(2)?.parse().ok()?;
                let gid = fields.get(3)?.parse().ok()?;
                Some((uid, gid))
            }))
    }

    /// Link created by `systemctl enable` for `name`.
    fn boot_link(&self, name: &str) -> PathBuf {
        self.paths
            .systemd_units
            .join(format!("{}.wants", BOOT_TARGET))
            .join(unit_name(name))
    }

    fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(read_db(&self.paths.group)?
            .iter()
            .any(|fields| fields.first().map(String::as_str) == Some(name)))
    }

    fn env_file(&self, name: &str, scope: &EnvScope) -> Result<PathBuf> {
        match scope {
            EnvScope::Machine => Ok(self
                .paths
                .profile_d
                .join(format!("provision-{}.sh", name.to_lowercase()))),
            EnvScope::User(user) => self
                .home_dir(user)?
                .map(|home| home.join(".bash_profile"))
                .ok_or_else(|| {
                    ProvisionError::configuration(format!("account '{}' has no home directory", user))
                }),
        }
    }

    fn require_root(&self, action: &str) -> Result<()> {
        if shell::is_elevated() {
            Ok(())
        } else {
            Err(ProvisionError::permission(format!(
                "{} requires root privileges",
                action
            )))
        }
    }
}

impl PlatformAdapter for LinuxAdapter {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Linux
    }

    fn principal_exists(&self, name: &str) -> Result<bool> {
        Ok(read_db(&self.paths.passwd)?
            .iter()
            .any(|fields| fields.first().map(String::as_str) == Some(name)))
    }

    fn create_principal(&self, principal: &Principal) -> Result<()> {
        self.require_root(&format!("creating account '{}'", principal.name))?;

        for group in &principal.groups {
            if !self.group_exists(group)? {
                admin_command(&Invocation::new("groupadd").arg(group))?;
            }
        }

        let mut useradd = Invocation::new("useradd").arg("-m");
        if let Some(primary) = principal.primary_group() {
            useradd = useradd.arg("-g").arg(primary);
        }
        let supplementary: Vec<&String> = principal.groups.iter().skip(1).collect();
        if !supplementary.is_empty() {
            let joined = supplementary
                .iter()
                .map(|g| g.as_str())
                .collect::<Vec<_>>()
                .join(",");
            useradd = useradd.arg("-G").arg(joined);
        }
        admin_command(&useradd.arg(&principal.name))?;

        set_initial_password(principal, &mut |invocation| admin_command(invocation))
    }

    fn set_owner_and_mode(&self, path: &Path, grant: &AccessGrant) -> Result<()> {
        let owner = match &grant.group {
            Some(group) => format!("{}:{}", grant.owner, group),
            None => grant.owner.clone(),
        };
        let mut chown = Invocation::new("chown");
        if grant.recursive {
            chown = chown.arg("-R");
        }
        admin_command(&chown.arg(owner).arg(path.display().to_string()))?;

        if let Some(mode) = grant.mode {
            let mut chmod = Invocation::new("chmod");
            if grant.recursive {
                chmod = chmod.arg("-R");
            }
            admin_command(
                &chmod
                    .arg(format!("{:o}", mode))
                    .arg(path.display().to_string()),
            )?;
        }
        Ok(())
    }

    fn restrict_file(&self, path: &Path, owner: Option<&str>) -> Result<()> {
        set_mode(path, 0o600)?;
        if let Some(owner) = owner {
            if shell::current_user().as_deref() != Some(owner) {
                admin_command(
                    &Invocation::new("chown")
                        .arg(owner)
                        .arg(path.display().to_string()),
                )?;
            }
        }
        Ok(())
    }

    fn persisted_env_var(&self, name: &str, scope: &EnvScope) -> Result<Option<String>> {
        let file = self.env_file(name, scope)?;
        match fs::read_to_string(&file) {
            Ok(content) => Ok(read_export(&content, name)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProvisionError::io(&file, e)),
        }
    }

    fn persist_env_var(&self, name: &str, value: &str, scope: &EnvScope) -> Result<()> {
        let file = self.env_file(name, scope)?;
        let existing = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ProvisionError::io(&file, e)),
        };
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
        }
        fs::write(&file, upsert_export(&existing, name, value))
            .map_err(|e| ProvisionError::io(&file, e))?;

        if let EnvScope::User(user) = scope {
            if shell::is_elevated() {
                let (uid, gid) = self.account_ids(user)?.ok_or_else(|| {
                    ProvisionError::configuration(format!("account '{}' has no passwd entry", user))
                })?;
                hand_over(&file, uid, gid)?;
            }
        }
        Ok(())
    }

    /// Registered means the unit is installed and enabled for boot.
    fn service_registered(&self, name: &str) -> Result<bool> {
        let unit = self.paths.systemd_units.join(unit_name(name));
        Ok(unit.is_file() && fs::symlink_metadata(self.boot_link(name)).is_ok())
    }

    fn install_service(&self, definition: &ServiceDefinition) -> Result<()> {
        self.require_root(&format!("registering service '{}'", definition.name))?;

        let unit = self.paths.systemd_units.join(unit_name(&definition.name));
        fs::create_dir_all(&self.paths.systemd_units)
            .map_err(|e| ProvisionError::io(&self.paths.systemd_units, e))?;
        fs::write(&unit, render_unit(definition)).map_err(|e| ProvisionError::io(&unit, e))?;

        admin_command(&Invocation::new("systemctl").arg("daemon-reload"))?;
        admin_command(
            &Invocation::new("systemctl")
                .arg("enable")
                .arg(unit_name(&definition.name)),
        )?;
        Ok(())
    }

    fn run_as_principal(&self, invocation: Invocation, principal: &Principal) -> Result<Invocation> {
        if shell::current_user().as_deref() == Some(principal.name.as_str()) {
            return Ok(invocation);
        }
        self.require_root(&format!("running as '{}'", principal.name))?;

        let mut wrapped = Invocation::new("runuser")
            .arg("-u")
            .arg(&principal.name)
            .arg("--")
            .arg(invocation.program.display().to_string())
            .args(invocation.args);
        wrapped.env = invocation.env;
        wrapped.cwd = invocation.cwd;
        wrapped.stdin = invocation.stdin;
        Ok(wrapped)
    }
}

/// Set the new account's password, removing the account when it is refused.
///
/// An account left without its password would pass the existence check on
/// every later run.
fn set_initial_password(
    principal: &Principal,
    run: &mut dyn FnMut(&Invocation) -> Result<String>,
) -> Result<()> {
    let Some(password) = &principal.password else {
        return Ok(());
    };
    let chpasswd = Invocation::new("chpasswd").stdin(format!("{}:{}\n", principal.name, password));
    if let Err(e) = run(&chpasswd) {
        tracing::warn!("Password for '{}' refused, removing the account", principal.name);
        let userdel = Invocation::new("userdel").arg("-r").arg(&principal.name);
        if let Err(undo) = run(&userdel) {
            tracing::warn!("Could not remove account '{}': {}", principal.name, undo);
        }
        return Err(e);
    }
    Ok(())
}

/// Parse a colon-separated account database, skipping comments.
fn read_db(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ProvisionError::io(path, e)),
    };
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .map(|l| l.split(':').map(str::to_string).collect())
        .collect())
}

fn unit_name(name: &str) -> String {
    if name.ends_with(".service") {
        name.to_string()
    } else {
        format!("{}.service", name)
    }
}

/// Value of `export NAME=...` in a profile script.
pub fn read_export(content: &str, name: &str) -> Option<String> {
    let prefix = format!("export {}=", name);
    content
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(&prefix))
        .map(|value| shell_unquote(value.trim()))
}

/// Replace (or append) `export NAME='value'` in a profile script.
pub fn upsert_export(content: &str, name: &str, value: &str) -> String {
    let prefix = format!("export {}=", name);
    let line = format!("export {}={}", name, shell_quote(value));
    let mut replaced = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|l| {
            if l.trim().starts_with(&prefix) {
                replaced = true;
                line.clone()
            } else {
                l.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(line);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Single-quote `value` so the shell reads it back byte for byte.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Literal text of a shell word. Expansions are left as written.
fn shell_unquote(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => out.extend(chars.by_ref().take_while(|&c| c != '\'')),
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.next() {
                            Some(next @ ('"' | '\\' | '$' | '`')) => out.push(next),
                            Some(next) => {
                                out.push('\\');
                                out.push(next);
                            }
                            None => out.push('\\'),
                        },
                        _ => out.push(c),
                    }
                }
            }
            '\\' => out.extend(chars.next()),
            _ => out.push(c),
        }
    }
    out
}

/// Render a systemd unit for `definition`.
pub fn render_unit(definition: &ServiceDefinition) -> String {
    let mut unit = String::new();
    unit.push_str("[Unit]\n");
    unit.push_str(&format!("Description={}\n", definition.description));
    unit.push_str("After=network-online.target\nWants=network-online.target\n\n");

    unit.push_str("[Service]\n");
    unit.push_str("Type=oneshot\nRemainAfterExit=yes\n");
    if let Some(principal) = &definition.run_as {
        unit.push_str(&format!("User={}\n", principal.name));
        if let Some(group) = principal.primary_group() {
            unit.push_str(&format!("Group={}\n", group));
        }
    }
    if let Some(dir) = &definition.working_dir {
        unit.push_str(&format!("WorkingDirectory={}\n", dir.display()));
    }
    unit.push_str(&format!("ExecStart={}\n", definition.start));
    if let Some(stop) = &definition.stop {
        unit.push_str(&format!("ExecStop={}\n", stop));
    }
    unit.push_str("\n[Install]\nWantedBy=multi-user.target\n");
    unit
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| ProvisionError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn hand_over(path: &Path, uid: u32, gid: u32) -> Result<()> {
    std::os::unix::fs::chown(path, Some(uid), Some(gid)).map_err(|e| ProvisionError::io(path, e))
}

#[cfg(not(unix))]
fn hand_over(_path: &Path, _uid: u32, _gid: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn adapter_with_account(temp: &TempDir) -> LinuxAdapter {
        let paths = LinuxPaths::under(temp.path());
        fs::create_dir_all(paths.passwd.parent().unwrap()).unwrap();
        let home = temp.path().join("home/oracle");
        fs::create_dir_all(&home).unwrap();
        fs::write(
            &paths.passwd,
            format!(
                "root:x:0:0:root:/root:/bin/bash\n# comment\noracle:x:54321:54321::{}:/bin/bash\n",
                home.display()
            ),
        )
        .unwrap();
        fs::write(&paths.group, "root:x:0:\noinstall:x:54321:\n").unwrap();
        LinuxAdapter::with_paths(paths)
    }

    #[test]
    fn principal_lookup_reads_passwd() {
        let temp = TempDir::new().unwrap();
        let adapter = adapter_with_account(&temp);

        assert!(adapter.principal_exists("oracle").unwrap());
        assert!(!adapter.principal_exists("grid").unwrap());
        assert!(adapter.group_exists("oinstall").unwrap());
        assert!(!adapter.group_exists("dba").unwrap());
    }

    #[test]
    fn missing_passwd_means_no_principals() {
        let temp = TempDir::new().unwrap();
        let adapter = LinuxAdapter::with_paths(LinuxPaths::under(temp.path()));
        assert!(!adapter.principal_exists("oracle").unwrap());
    }

    #[test]
    fn user_env_var_round_trips_through_bash_profile() {
        let temp = TempDir::new().unwrap();
        let adapter = adapter_with_account(&temp);
        let scope = EnvScope::User("oracle".into());

        assert_eq!(adapter.persisted_env_var("ORACLE_SID", &scope).unwrap(), None);
        adapter.persist_env_var("ORACLE_SID", "ORCL", &scope).unwrap();
        adapter.persist_env_var("ORACLE_SID", "CDB1", &scope).unwrap();

        assert_eq!(
            adapter.persisted_env_var("ORACLE_SID", &scope).unwrap(),
            Some("CDB1".to_string())
        );
        let profile = fs::read_to_string(temp.path().join("home/oracle/.bash_profile")).unwrap();
        assert_eq!(profile.matches("ORACLE_SID").count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn root_hands_user_profile_to_the_account() {
        use std::os::unix::fs::MetadataExt;

        if !shell::is_elevated() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let adapter = adapter_with_account(&temp);
        adapter
            .persist_env_var("ORACLE_BASE", "/u01/app/oracle", &EnvScope::User("oracle".into()))
            .unwrap();

        let meta = fs::metadata(temp.path().join("home/oracle/.bash_profile")).unwrap();
        assert_eq!((meta.uid(), meta.gid()), (54321, 54321));
    }

    #[test]
    fn account_ids_come_from_passwd() {
        let temp = TempDir::new().unwrap();
        let adapter = adapter_with_account(&temp);
        assert_eq!(adapter.account_ids("oracle").unwrap(), Some((54321, 54321)));
        assert_eq!(adapter.account_ids("grid").unwrap(), None);
    }

    #[test]
    fn machine_env_var_lives_in_profile_d() {
        let temp = TempDir::new().unwrap();
        let adapter = LinuxAdapter::with_paths(LinuxPaths::under(temp.path()));

        adapter
            .persist_env_var("ORACLE_HOME", "/u01/home", &EnvScope::Machine)
            .unwrap();
        assert!(temp
            .path()
            .join("etc/profile.d/provision-oracle_home.sh")
            .exists());
        assert_eq!(
            adapter
                .persisted_env_var("ORACLE_HOME", &EnvScope::Machine)
                .unwrap()
                .as_deref(),
            Some("/u01/home")
        );
    }

    #[test]
    fn user_scope_without_account_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let adapter = adapter_with_account(&temp);
        let err = adapter
            .persisted_env_var("X", &EnvScope::User("nobody".into()))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Configuration { .. }));
    }

    #[test]
    fn upsert_export_keeps_other_lines() {
        let content = "# profile\nexport PATH=$PATH:/bin\nexport A=1\n";
        let updated = upsert_export(content, "A", "2");
        assert_eq!(updated, "# profile\nexport PATH=$PATH:/bin\nexport A='2'\n");
        assert_eq!(read_export(&updated, "A").as_deref(), Some("2"));
        assert_eq!(read_export(&updated, "PATH").as_deref(), Some("$PATH:/bin"));
    }

    #[test]
    fn shell_metacharacters_survive_the_profile() {
        let value = r#"a$HOME`id`\n'q'"x"#;
        let updated = upsert_export("", "ORACLE_PASSPHRASE", value);

        assert_eq!(read_export(&updated, "ORACLE_PASSPHRASE").as_deref(), Some(value));
        assert_eq!(
            read_export("export B=\"x\\$y\"", "B").as_deref(),
            Some("x$y")
        );
    }

    #[cfg(unix)]
    #[test]
    fn sourced_profile_yields_the_literal_value() {
        let temp = TempDir::new().unwrap();
        let profile = temp.path().join("profile.sh");
        let value = r#"a$HOME`id`\n'q'"x"#;
        fs::write(&profile, upsert_export("", "ORACLE_PASSPHRASE", value)).unwrap();

        let script = format!(". '{}'; printf %s \"$ORACLE_PASSPHRASE\"", profile.display());
        let result = shell::execute_quiet(&Invocation::new("/bin/sh").arg("-c").arg(script)).unwrap();
        assert_eq!(result.stdout, value);
    }

    #[test]
    fn service_needs_unit_and_boot_link() {
        let temp = TempDir::new().unwrap();
        let adapter = LinuxAdapter::with_paths(LinuxPaths::under(temp.path()));
        assert!(!adapter.service_registered("dbora").unwrap());

        let units = temp.path().join("etc/systemd/system");
        fs::create_dir_all(&units).unwrap();
        fs::write(units.join("dbora.service"), "").unwrap();
        // Installed but never enabled.
        assert!(!adapter.service_registered("dbora").unwrap());

        let wants = units.join("multi-user.target.wants");
        fs::create_dir_all(&wants).unwrap();
        fs::write(wants.join("dbora.service"), "").unwrap();
        assert!(adapter.service_registered("dbora").unwrap());
    }

    #[test]
    fn refused_password_removes_the_new_account() {
        let principal = Principal::new("oracle").with_password(Some("weak".into()));
        let mut ran = Vec::new();
        let err = set_initial_password(&principal, &mut |inv| {
            ran.push(inv.to_string());
            if inv.program_name() == "chpasswd" {
                Err(ProvisionError::validation("chpasswd rejected the password: BAD PASSWORD"))
            } else {
                Ok(String::new())
            }
        })
        .unwrap_err();

        assert!(matches!(err, ProvisionError::Validation { .. }));
        assert_eq!(ran, vec!["chpasswd", "userdel -r oracle"]);
    }

    #[test]
    fn accepted_password_keeps_the_account() {
        let principal = Principal::new("oracle").with_password(Some("Welcome1x".into()));
        let mut ran = Vec::new();
        set_initial_password(&principal, &mut |inv| {
            ran.push(inv.stdin.clone().unwrap_or_default());
            Ok(String::new())
        })
        .unwrap();

        assert_eq!(ran, vec!["oracle:Welcome1x\n"]);
    }

    #[test]
    fn no_password_runs_nothing() {
        let mut ran = 0;
        set_initial_password(&Principal::new("oracle"), &mut |_| {
            ran += 1;
            Ok(String::new())
        })
        .unwrap();
        assert_eq!(ran, 0);
    }

    #[test]
    fn render_unit_includes_commands_and_account() {
        let definition = ServiceDefinition {
            name: "dbora".into(),
            description: "Oracle Database".into(),
            start: Invocation::new("/u01/home/bin/dbstart").arg("/u01/home"),
            stop: Some(Invocation::new("/u01/home/bin/dbshut").arg("/u01/home")),
            run_as: Some(Principal::new("oracle").with_groups(vec!["oinstall".into()])),
            working_dir: None,
        };
        let unit = render_unit(&definition);

        assert!(unit.contains("ExecStart=/u01/home/bin/dbstart /u01/home"));
        assert!(unit.contains("ExecStop=/u01/home/bin/dbshut /u01/home"));
        assert!(unit.contains("User=oracle"));
        assert!(unit.contains("Group=oinstall"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[test]
    fn run_as_current_user_is_unchanged() {
        let Some(me) = shell::current_user() else {
            return;
        };
        let adapter = LinuxAdapter::new();
        let inv = Invocation::new("/bin/true").arg("x");
        let out = adapter
            .run_as_principal(inv.clone(), &Principal::new(me))
            .unwrap();
        assert_eq!(out, inv);
    }

    #[cfg(unix)]
    #[test]
    fn restrict_file_sets_owner_only_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("dbca.rsp");
        fs::write(&file, "x=1").unwrap();
        LinuxAdapter::new().restrict_file(&file, None).unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
