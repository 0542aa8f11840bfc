use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Single-entry `NAME=VALUE` file holding the API key, `.env` by default.
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finds the key in the file. Lines that do not parse are skipped, since
    /// the file may be shared with other tools.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let entries = dotenvy::from_path_iter(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        for entry in entries {
            let (name, value) = match entry {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping unparsable line");
                    continue;
                }
            };
            if name == API_KEY_VAR && !value.trim().is_empty() {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Replaces the file with exactly one `GEMINI_API_KEY=<value>` line.
    pub fn save(&self, api_key: &str) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        fs::write(&self.path, format!("{API_KEY_VAR}={api_key}\n"))
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(path = %self.path.display(), "saved api key");
        Ok(())
    }
}

/// Where the key came from; `Prompt` means it was just written to the key file.
#[derive(Debug, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    KeyFile,
    Config,
    Prompt,
}

/// Resolves the API key once at startup: environment, key file, config,
/// then the interactive prompt (whose answer is persisted).
pub fn resolve_api_key(
    env_value: Option<String>,
    config_value: Option<String>,
    key_file: &KeyFile,
    prompt: &mut dyn FnMut() -> Result<String>,
) -> Result<(String, KeySource)> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

    if present(&env_value) {
        return Ok((env_value.unwrap_or_default(), KeySource::Environment));
    }
    if let Some(key) = key_file.load()? {
        return Ok((key, KeySource::KeyFile));
    }
    if present(&config_value) {
        return Ok((config_value.unwrap_or_default(), KeySource::Config));
    }

    let entered = prompt()?;
    let entered = entered.trim();
    if entered.is_empty() {
        bail!("{API_KEY_VAR} is required (set it in the environment, .env, or the config file)");
    }
    key_file.save(entered)?;
    Ok((entered.to_string(), KeySource::Prompt))
}

/// Reads one line from stdin after printing `message`.
pub fn prompt_stdin(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read api key from stdin")?;
    Ok(line)
}
