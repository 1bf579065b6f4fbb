//! Process launching seam.
//!
//! Records call into a `Launcher` to bring an application up or down. The
//! dashboard ships with `StubLauncher`, which only traces the request; a real
//! implementation would spawn and signal child processes here.

use std::path::Path;

use thiserror::Error;

/// Failure reported by a launcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// The application could not be launched.
    #[error("failed to launch {name}: {reason}")]
    Launch { name: String, reason: String },
    /// The application could not be terminated.
    #[error("failed to terminate {name}: {reason}")]
    Terminate { name: String, reason: String },
}

/// Brings applications up and down on behalf of their records.
pub trait Launcher: Send + Sync {
    /// Launches `name`, directing its output under `log_path`.
    fn launch(&self, name: &str, log_path: &Path) -> Result<(), LaunchError>;
    /// Terminates `name`.
    fn terminate(&self, name: &str) -> Result<(), LaunchError>;
}

/// Launcher that never fails and never spawns anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubLauncher;

impl Launcher for StubLauncher {
    fn launch(&self, name: &str, log_path: &Path) -> Result<(), LaunchError> {
        tracing::debug!(app = name, log_path = %log_path.display(), "stub launch");
        Ok(())
    }

    fn terminate(&self, name: &str) -> Result<(), LaunchError> {
        tracing::debug!(app = name, "stub terminate");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_launcher_always_succeeds() {
        let launcher = StubLauncher;
        assert!(launcher.launch("api", Path::new("/var/log/apps")).is_ok());
        assert!(launcher.terminate("api").is_ok());
    }

    #[test]
    fn launch_error_names_the_application() {
        let err = LaunchError::Launch {
            name: "api".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "failed to launch api: not found");
    }
}
