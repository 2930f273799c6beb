//! Host services outside the network stack.
//!
//! The `env`, `user`, `dns` and `ip4_fw` objects touch the process
//! environment, a few files and shell commands. [`Host`] abstracts those so
//! the dispatcher runs unchanged against [`SystemHost`] or the in-memory
//! [`MemoryHost`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Environment, file and command access.
#[allow(async_fn_in_trait)]
pub trait Host {
    fn var(&self, name: &str) -> Option<String>;

    /// All variables, in environment order.
    fn vars(&self) -> Vec<(String, String)>;

    fn set_var(&mut self, name: &str, value: &str) -> Result<()>;

    fn remove_var(&mut self, name: &str) -> Result<()>;

    async fn read_to_string(&mut self, path: &Path) -> Result<String>;

    async fn write(&mut self, path: &Path, contents: &str) -> Result<()>;

    /// Run `command` through `sh -c`. A non-zero exit is
    /// [`Error::ShellCommandFailed`].
    async fn run(&mut self, command: &str) -> Result<()>;
}

fn check_var_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['=', '\0']) {
        return Err(Error::InvalidValue(format!(
            "invalid environment variable name: {:?}",
            name
        )));
    }
    Ok(())
}

/// The real host.
#[derive(Debug, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.to_string_lossy().into_owned(),
                )
            })
            .collect()
    }

    fn set_var(&mut self, name: &str, value: &str) -> Result<()> {
        check_var_name(name)?;
        if value.contains('\0') {
            return Err(Error::InvalidValue(format!("value of {} contains NUL", name)));
        }
        // SAFETY: requests are served one at a time and nothing else in the
        // agent reads the environment concurrently.
        unsafe { std::env::set_var(name, value) };
        Ok(())
    }

    fn remove_var(&mut self, name: &str) -> Result<()> {
        check_var_name(name)?;
        // SAFETY: see `set_var`.
        unsafe { std::env::remove_var(name) };
        Ok(())
    }

    async fn read_to_string(&mut self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::from(e).with_context(format!("read {}", path.display())))
    }

    async fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| Error::from(e).with_context(format!("write {}", path.display())))
    }

    async fn run(&mut self, command: &str) -> Result<()> {
        debug!("running: {}", command);
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .await
            .map_err(|e| Error::from(e).with_context(format!("spawn {}", command)))?;
        if !status.success() {
            return Err(Error::ShellCommandFailed {
                command: command.to_owned(),
            });
        }
        Ok(())
    }
}

/// In-memory host for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryHost {
    env: Vec<(String, String)>,
    files: HashMap<PathBuf, String>,
    commands: Vec<String>,
    failing: Vec<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.env.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.insert(path.into(), contents.to_owned());
        self
    }

    /// Make every command containing `pattern` exit non-zero.
    pub fn fail_commands_containing(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_owned());
        self
    }

    /// Commands run so far, in order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }
}

impl Host for MemoryHost {
    fn var(&self, name: &str) -> Option<String> {
        self.env
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.env.clone()
    }

    fn set_var(&mut self, name: &str, value: &str) -> Result<()> {
        check_var_name(name)?;
        match self.env.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => self.env.push((name.to_owned(), value.to_owned())),
        }
        Ok(())
    }

    fn remove_var(&mut self, name: &str) -> Result<()> {
        check_var_name(name)?;
        self.env.retain(|(k, _)| k != name);
        Ok(())
    }

    async fn read_to_string(&mut self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            Error::from_errno(libc::ENOENT).with_context(format!("read {}", path.display()))
        })
    }

    async fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.files.insert(path.to_owned(), contents.to_owned());
        Ok(())
    }

    async fn run(&mut self, command: &str) -> Result<()> {
        self.commands.push(command.to_owned());
        if self.failing.iter().any(|p| command.contains(p.as_str())) {
            return Err(Error::ShellCommandFailed {
                command: command.to_owned(),
            });
        }
        Ok(())
    }
}
