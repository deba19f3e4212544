//! Windows adapter.
//!
//! Drives the stock administrative tools (`net`, `icacls`, `reg`, `setx`,
//! `sc.exe`, PowerShell) so nothing beyond the base OS is required.

use std::path::Path;

use crate::error::{ProvisionError, Result};
use crate::platform::{
    admin_command, AccessGrant, EnvScope, PlatformAdapter, PlatformKind, Principal,
    ServiceDefinition,
};
use crate::shell::{self, Invocation};

const MACHINE_ENV_KEY: &str =
    r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
const USER_ENV_KEY: &str = r"HKCU\Environment";

/// Env var that hands a run-as password to the PowerShell wrapper.
pub const RUN_AS_PASSWORD_VAR: &str = "PROVISION_RUN_AS_PASSWORD";

/// Default rights granted by [`AccessGrant`]s that name none.
const FULL_CONTROL: &str = "(OI)(CI)F";

/// [`PlatformAdapter`] for Windows hosts.
#[derive(Debug, Clone, Default)]
pub struct WindowsAdapter;

impl WindowsAdapter {
    pub fn new() -> Self {
        Self
    }

    fn local_group_exists(&self, name: &str) -> bool {
        shell::execute_check(&Invocation::new("net").arg("localgroup").arg(name))
    }
}

impl PlatformAdapter for WindowsAdapter {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Windows
    }

    fn principal_exists(&self, name: &str) -> Result<bool> {
        Ok(shell::execute_check(
            &Invocation::new("net").arg("user").arg(name),
        ))
    }

    fn create_principal(&self, principal: &Principal) -> Result<()> {
        for group in &principal.groups {
            if !self.local_group_exists(group) {
                admin_command(
                    &Invocation::new("net")
                        .arg("localgroup")
                        .arg(group)
                        .arg("/add"),
                )?;
            }
        }

        let password = principal.password.as_deref().ok_or_else(|| {
            ProvisionError::validation(format!("account '{}' needs a password", principal.name))
        })?;
        admin_command(
            &Invocation::new("net")
                .arg("user")
                .arg(&principal.name)
                .arg(password)
                .arg("/add")
                .arg("/expires:never")
                .arg("/passwordchg:no"),
        )?;

        for group in &principal.groups {
            admin_command(
                &Invocation::new("net")
                    .arg("localgroup")
                    .arg(group)
                    .arg(&principal.name)
                    .arg("/add"),
            )?;
        }
        Ok(())
    }

    fn set_owner_and_mode(&self, path: &Path, grant: &AccessGrant) -> Result<()> {
        let target = path.display().to_string();
        let recurse = |inv: Invocation| {
            if grant.recursive {
                inv.arg("/T").arg("/C")
            } else {
                inv
            }
        };

        admin_command(&recurse(
            Invocation::new("icacls")
                .arg(&target)
                .arg("/setowner")
                .arg(&grant.owner),
        ))?;

        let rights = grant.rights.as_deref().unwrap_or(FULL_CONTROL);
        let mut grants = vec![format!("{}:{}", grant.owner, rights)];
        if let Some(group) = &grant.group {
            grants.push(format!("{}:{}", group, rights));
        }
        let mut icacls = Invocation::new("icacls").arg(&target);
        for g in grants {
            icacls = icacls.arg("/grant").arg(g);
        }
        admin_command(&recurse(icacls))?;
        Ok(())
    }

    fn restrict_file(&self, path: &Path, owner: Option<&str>) -> Result<()> {
        let owner = owner
            .map(str::to_string)
            .or_else(shell::current_user)
            .ok_or_else(|| ProvisionError::configuration("cannot determine the file owner"))?;

        admin_command(
            &Invocation::new("icacls")
                .arg(path.display().to_string())
                .arg("/inheritance:r")
                .arg("/grant:r")
                .arg(format!("{}:F", owner))
                .arg("/grant:r")
                .arg("*S-1-5-18:F")
                .arg("/grant:r")
                .arg("*S-1-5-32-544:F"),
        )?;
        Ok(())
    }

    fn persisted_env_var(&self, name: &str, scope: &EnvScope) -> Result<Option<String>> {
        let key = registry_key(scope)?;
        let result = shell::execute_quiet(
            &Invocation::new("reg")
                .arg("query")
                .arg(key)
                .arg("/v")
                .arg(name),
        )?;
        if !result.success {
            return Ok(None);
        }
        Ok(parse_reg_query(&result.stdout, name))
    }

    fn persist_env_var(&self, name: &str, value: &str, scope: &EnvScope) -> Result<()> {
        registry_key(scope)?;
        let mut setx = Invocation::new("setx").arg(name).arg(value);
        if *scope == EnvScope::Machine {
            setx = setx.arg("/M");
        }
        admin_command(&setx)?;
        Ok(())
    }

    fn service_registered(&self, name: &str) -> Result<bool> {
        Ok(shell::execute_check(
            &Invocation::new("sc.exe").arg("query").arg(name),
        ))
    }

    fn install_service(&self, definition: &ServiceDefinition) -> Result<()> {
        if definition.stop.is_some() {
            tracing::debug!(
                "Service '{}' is stopped by the service manager; stop command ignored",
                definition.name
            );
        }

        let mut create = Invocation::new("sc.exe")
            .arg("create")
            .arg(&definition.name)
            .arg("binPath=")
            .arg(definition.start.to_string())
            .arg("start=")
            .arg("auto")
            .arg("DisplayName=")
            .arg(&definition.description);
        if let Some(principal) = &definition.run_as {
            create = create.arg("obj=").arg(format!(".\\{}", principal.name));
            if let Some(password) = &principal.password {
                create = create.arg("password=").arg(password);
            }
        }
        admin_command(&create)?;

        admin_command(
            &Invocation::new("sc.exe")
                .arg("description")
                .arg(&definition.name)
                .arg(&definition.description),
        )?;
        Ok(())
    }

    fn run_as_principal(&self, invocation: Invocation, principal: &Principal) -> Result<Invocation> {
        if shell::current_user()
            .is_some_and(|me| me.eq_ignore_ascii_case(&principal.name))
        {
            return Ok(invocation);
        }
        let password = principal.password.clone().ok_or_else(|| {
            ProvisionError::configuration(format!(
                "running as '{}' requires its password",
                principal.name
            ))
        })?;

        let mut wrapped = Invocation::new("powershell.exe")
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg(start_process_script(&invocation, &principal.name))
            .env(RUN_AS_PASSWORD_VAR, password);
        wrapped.env.extend(invocation.env);
        wrapped.cwd = invocation.cwd;
        wrapped.stdin = invocation.stdin;
        Ok(wrapped)
    }
}

fn registry_key(scope: &EnvScope) -> Result<&'static str> {
    match scope {
        EnvScope::Machine => Ok(MACHINE_ENV_KEY),
        EnvScope::User(name) => match shell::current_user() {
            Some(me) if me.eq_ignore_ascii_case(name) => Ok(USER_ENV_KEY),
            _ => Err(ProvisionError::configuration(format!(
                "user-scoped variables can only be set for the current account, not '{}'",
                name
            ))),
        },
    }
}

/// Value of `name` in `reg query` output.
pub fn parse_reg_query(output: &str, name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let key = parts.next()?;
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let kind = parts.next()?;
        if !kind.starts_with("REG_") {
            return None;
        }
        let rest = line
            .splitn(2, kind)
            .nth(1)
            .map(str::trim)
            .unwrap_or_default();
        Some(rest.to_string())
    })
}

/// PowerShell that launches `invocation` under `account` and propagates its exit code.
fn start_process_script(invocation: &Invocation, account: &str) -> String {
    let quote = |s: &str| format!("'{}'", s.replace('\'', "''"));
    let args = invocation
        .args
        .iter()
        .map(|a| quote(a))
        .collect::<Vec<_>>()
        .join(",");
    let arg_list = if args.is_empty() {
        String::new()
    } else {
        format!(" -ArgumentList @({})", args)
    };
    format!(
        "$p = ConvertTo-SecureString $env:{var} -AsPlainText -Force; \
         $c = New-Object System.Management.Automation.PSCredential({user}, $p); \
         $r = Start-Process -FilePath {program}{arg_list} -Credential $c -Wait -PassThru -NoNewWindow; \
         exit $r.ExitCode",
        var = RUN_AS_PASSWORD_VAR,
        user = quote(account),
        program = quote(&invocation.program.display().to_string()),
        arg_list = arg_list,
    )
}
