//! Paste injection: making the focused application paste what was just put
//! on the clipboard.
//!
//! Synthesizing the keystroke is platform glue, so it is delegated to an
//! external command configured under `[paste]`. Injection runs after the
//! clipboard write and its failures are only logged.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use clipkeep_core::config::{self, PasteConfig, SharedConfig};
use clipkeep_core::error::{ClipkeepError, Result};

/// Sends the paste keystroke to whatever application has focus.
#[async_trait]
pub trait PasteInjector: Send + Sync {
    async fn inject(&self) -> Result<()>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Does nothing. Used when no paste command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInjector;

#[async_trait]
impl PasteInjector for NoopInjector {
    async fn inject(&self) -> Result<()> {
        debug!("No paste command configured, skipping injection");
        Ok(())
    }

    fn describe(&self) -> String {
        "no-op".to_string()
    }
}

/// Runs an external program after a short delay.
#[derive(Debug, Clone)]
pub struct CommandInjector {
    program: String,
    args: Vec<String>,
    delay: Duration,
}

impl CommandInjector {
    /// Build from an argv list. The list must name a program.
    pub fn new(command: &[String], delay: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ClipkeepError::Paste("Paste command must not be empty".to_string()))?;
        if program.trim().is_empty() {
            return Err(ClipkeepError::Paste(
                "Paste command must name a program".to_string(),
            ));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            delay,
        })
    }

    /// `None` when the configuration has no command.
    pub fn from_config(paste: &PasteConfig) -> Option<Self> {
        Self::new(&paste.command, Duration::from_millis(paste.delay_ms)).ok()
    }
}

#[async_trait]
impl PasteInjector for CommandInjector {
    async fn inject(&self) -> Result<()> {
        tokio::time::sleep(self.delay).await;

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| ClipkeepError::Paste(format!("Failed to run {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(ClipkeepError::Paste(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        info!(command = %self.describe(), "Paste keystroke injected");
        Ok(())
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reads `[paste]` from the live configuration on every paste, so a saved
/// settings change takes effect immediately.
#[derive(Clone)]
pub struct ConfiguredInjector {
    config: SharedConfig,
}

impl ConfiguredInjector {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PasteInjector for ConfiguredInjector {
    async fn inject(&self) -> Result<()> {
        let paste = config::snapshot(&self.config).paste;
        match CommandInjector::from_config(&paste) {
            Some(injector) => injector.inject().await,
            None => NoopInjector.inject().await,
        }
    }

    fn describe(&self) -> String {
        let paste = config::snapshot(&self.config).paste;
        match CommandInjector::from_config(&paste) {
            Some(injector) => injector.describe(),
            None => NoopInjector.describe(),
        }
    }
}
