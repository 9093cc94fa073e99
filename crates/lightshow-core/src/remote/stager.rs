//! Getting show files onto the remote device.

use crate::RemoteError;
use crate::config::StagerConfig;
use std::path::Path;
use std::process::Command;

/// Moves a generated show file to the remote device and starts its player.
pub trait ShowStager: Send + Sync {
    /// Copy `show` to the remote device.
    fn upload(&self, show: &Path) -> Result<(), RemoteError>;

    /// Start the remote player on the previously uploaded `show`.
    fn launch(&self, show: &Path) -> Result<(), RemoteError>;

    /// Whether this stager reaches a remote device at all.
    fn is_active(&self) -> bool {
        true
    }

    /// Upload, then launch.
    fn stage(&self, show: &Path) -> Result<(), RemoteError> {
        self.upload(show)?;
        self.launch(show)
    }
}

/// Stager for setups without a remote device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStager;

impl ShowStager for NullStager {
    fn upload(&self, _show: &Path) -> Result<(), RemoteError> {
        Ok(())
    }

    fn launch(&self, _show: &Path) -> Result<(), RemoteError> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Stager that runs configured external commands (typically `scp` and `ssh`).
#[derive(Debug, Clone, Default)]
pub struct CommandStager {
    config: StagerConfig,
}

impl CommandStager {
    /// Stager for the configured command templates.
    pub fn new(config: StagerConfig) -> Self {
        Self { config }
    }

    /// Boxed stager for `config`: commands when any are set, otherwise a no-op.
    pub fn from_config(config: &StagerConfig) -> Box<dyn ShowStager> {
        if config.upload.is_none() && config.launch.is_none() {
            Box::new(NullStager)
        } else {
            Box::new(Self::new(config.clone()))
        }
    }

    fn run(
        &self,
        step: &str,
        template: Option<&Vec<String>>,
        show: &Path,
    ) -> Result<(), RemoteError> {
        let Some(template) = template else {
            return Ok(());
        };
        let argv = expand(template, show);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RemoteError::Stage(format!("empty {step} command")))?;

        log::info!("{step}: {}", argv.join(" "));
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| {
                RemoteError::Stage(format!("{step} command {program:?} failed to start: {e}"))
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(RemoteError::Stage(format!("{step} command exited with {status}")))
        }
    }
}

impl ShowStager for CommandStager {
    fn upload(&self, show: &Path) -> Result<(), RemoteError> {
        self.run("upload", self.config.upload.as_ref(), show)
    }

    fn launch(&self, show: &Path) -> Result<(), RemoteError> {
        self.run("launch", self.config.launch.as_ref(), show)
    }
}

/// Substitute `{show}` and `{name}` in every argument.
fn expand(template: &[String], show: &Path) -> Vec<String> {
    let path = show.display().to_string();
    let name = show
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    template
        .iter()
        .map(|arg| arg.replace("{show}", &path).replace("{name}", &name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_placeholders() {
        let argv = expand(
            &["ssh".into(), "pi".into(), "sudo ./led_server \"shows/{name}\" &".into()],
            Path::new("/tmp/shows/Carol.show"),
        );
        assert_eq!(argv[2], "sudo ./led_server \"shows/Carol.show\" &");
    }

    #[test]
    fn empty_config_is_inactive() {
        assert!(!CommandStager::from_config(&StagerConfig::default()).is_active());
    }

    #[cfg(unix)]
    #[test]
    fn runs_upload_command() {
        let dir = tempfile::tempdir().unwrap();
        let show = dir.path().join("Carol.show");
        std::fs::write(&show, [1, 2, 3]).unwrap();
        let dest = dir.path().join("remote");
        std::fs::create_dir(&dest).unwrap();

        let stager = CommandStager::new(StagerConfig {
            upload: Some(vec!["cp".into(), "{show}".into(), dest.display().to_string()]),
            launch: None,
        });
        stager.stage(&show).unwrap();
        assert_eq!(std::fs::read(dest.join("Carol.show")).unwrap(), [1, 2, 3]);
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_stage_error() {
        let stager = CommandStager::new(StagerConfig {
            upload: None,
            launch: Some(vec!["false".into()]),
        });
        let err = stager.launch(Path::new("x.show")).unwrap_err();
        assert!(matches!(err, RemoteError::Stage(_)));
    }
}
