//! Agent configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default.
//!
//! ```json
//! {
//!   "name": "Agt_A",
//!   "backend": "ioctl",
//!   "hidden_env": ["SSH_CLIENT", "SSH_CONNECTION", "SUDO_COMMAND", "TE_RPC_PORT"],
//!   "user_prefix": "te_tester_",
//!   "paths": { "resolv_conf": "/etc/resolv.conf", "vconfig": "/sbin/vconfig" }
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which backend serves OS requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// rtnetlink.
    #[default]
    Netlink,
    /// ioctl sockets and procfs.
    Ioctl,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Netlink => f.write_str("netlink"),
            Self::Ioctl => f.write_str("ioctl"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "netlink" => Ok(Self::Netlink),
            "ioctl" => Ok(Self::Ioctl),
            other => Err(Error::InvalidValue(format!("unknown backend: {}", other))),
        }
    }
}

/// Host files and helpers the handlers read or run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostPaths {
    pub resolv_conf: PathBuf,
    pub passwd: PathBuf,
    pub ip_forward: PathBuf,
    pub proc_net_dev: PathBuf,
    pub proc_net_arp: PathBuf,
    pub proc_net_route: PathBuf,
    /// VLAN helper used by the ioctl backend.
    pub vconfig: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            resolv_conf: "/etc/resolv.conf".into(),
            passwd: "/etc/passwd".into(),
            ip_forward: "/proc/sys/net/ipv4/ip_forward".into(),
            proc_net_dev: "/proc/net/dev".into(),
            proc_net_arp: "/proc/net/arp".into(),
            proc_net_route: "/proc/net/route".into(),
            vconfig: "/sbin/vconfig".into(),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Test agent name, the instance of the `/agent` root.
    pub name: String,
    pub backend: BackendKind,
    /// Environment variables never exposed through the `env` object.
    pub hidden_env: Vec<String>,
    /// Prefix of the accounts managed through the `user` object.
    pub user_prefix: String,
    pub paths: HostPaths,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Agt_A".into(),
            backend: BackendKind::default(),
            hidden_env: ["SSH_CLIENT", "SSH_CONNECTION", "SUDO_COMMAND", "TE_RPC_PORT"]
                .into_iter()
                .map(String::from)
                .collect(),
            user_prefix: "te_tester_".into(),
            paths: HostPaths::default(),
        }
    }
}

impl AgentConfig {
    /// Parse a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidFormat(format!("agent configuration: {}", e)))
    }

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context(format!("read {}", path.display())))?;
        Self::from_json(&text)
    }

    /// Check if `name` is hidden from the `env` object.
    pub fn is_hidden_env(&self, name: &str) -> bool {
        self.hidden_env.iter().any(|h| h == name)
    }
}
