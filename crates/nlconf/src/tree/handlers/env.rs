//! `env`: process environment variables.
//!
//! Names listed in the configuration's `hidden_env` are invisible: absent
//! from listings, not found on get, and refused on set/add/del.

use crate::backend::{Backend, Tokens};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::tree::agent::Agent;

impl<B: Backend, H: Host> Agent<B, H> {
    fn env_check_visible(&self, name: &str) -> Result<()> {
        if self.config.is_hidden_env(name) {
            return Err(Error::PermissionDenied(format!(
                "environment variable {} is hidden",
                name
            )));
        }
        Ok(())
    }

    pub(crate) fn env_get(&self, name: &str) -> Result<String> {
        if self.config.is_hidden_env(name) {
            return Err(Error::not_found(format!("environment variable {}", name)));
        }
        self.host
            .var(name)
            .ok_or_else(|| Error::not_found(format!("environment variable {}", name)))
    }

    pub(crate) fn env_set(&mut self, name: &str, value: &str) -> Result<()> {
        self.env_check_visible(name)?;
        self.host.set_var(name, value)
    }

    pub(crate) fn env_add(&mut self, name: &str, value: &str) -> Result<()> {
        self.env_check_visible(name)?;
        if self.host.var(name).is_some() {
            return Err(Error::exists(format!("environment variable {}", name)));
        }
        self.host.set_var(name, value)
    }

    pub(crate) fn env_del(&mut self, name: &str) -> Result<()> {
        self.env_check_visible(name)?;
        if self.host.var(name).is_none() {
            return Err(Error::not_found(format!("environment variable {}", name)));
        }
        self.host.remove_var(name)
    }

    pub(crate) fn env_list(&self) -> Tokens {
        let names: Vec<String> = self
            .host
            .vars()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| !self.config.is_hidden_env(name))
            .collect();
        names.into_iter()
    }
}
