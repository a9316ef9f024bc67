//! Boundary to the external `ampart` partitioning tool

use eptkit_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Runs `ampart <target> --mode esnapshot` and hands back its stdout
#[derive(Debug, Clone)]
pub struct Ampart {
    program: PathBuf,
}

impl Ampart {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Dump the EPT of `target` (a block device or full image) as snapshot lines
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the program cannot be started,
    /// [`Error::ExternalToolFailure`] if it exits unsuccessfully.
    pub fn esnapshot(&self, target: &Path) -> Result<String> {
        tracing::debug!(
            "Running {} {} --mode esnapshot",
            self.program.display(),
            target.display()
        );

        let output = Command::new(&self.program)
            .arg(target)
            .args(["--mode", "esnapshot"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(Error::external_tool(
                self.program.display().to_string(),
                output.status.to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for Ampart {
    fn default() -> Self {
        Self::new("ampart")
    }
}
