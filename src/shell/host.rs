//! Facts about the host the tool is running on.

use crate::shell::command::{execute_quiet, Invocation};

/// Check if running in a CI environment.
///
/// Used to force non-interactive mode in `main()` so a missing password
/// fails instead of blocking on a prompt nobody can answer.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "JENKINS_URL", "TF_BUILD"]
        .iter()
        .any(|var| std::env::var(var).is_ok())
}

/// Check if running as root/admin.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(windows)]
    {
        // `net session` is refused for non-elevated tokens.
        crate::shell::command::execute_check(&Invocation::new("net").arg("session"))
    }

    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

/// Name of the account running this process, if it can be determined.
pub fn current_user() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .or_else(|| {
            if cfg!(unix) {
                execute_quiet(&Invocation::new("id").arg("-un"))
                    .ok()
                    .filter(|r| r.success)
                    .map(|r| r.stdout.trim().to_string())
            } else {
                None
            }
        })
}
