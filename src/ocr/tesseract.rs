use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::TextRecognizer;
use crate::config::WorkerConfig;

/// Runs the `tesseract` binary and reads its stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    bin: String,
    langs: String,
}

impl TesseractCli {
    pub fn new(bin: impl Into<String>, langs: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            langs: langs.into(),
        }
    }

    pub fn from_config(cfg: &WorkerConfig) -> Self {
        Self::new(&cfg.tesseract_bin, &cfg.tesseract_langs)
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg(image_path)
            .arg("stdout")
            .args(["-l", &self.langs])
            .args(["--psm", "3"])
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn extract(&self, image_path: &Path) -> anyhow::Result<String> {
        let output = self
            .command(image_path)
            .output()
            .await
            .with_context(|| format!("spawn {}", self.bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.bin, output.status, stderr.trim());
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "tesseract finished");
        Ok(text)
    }
}
