//! Object instance identifiers.
//!
//! `/agent:<ta>/<object>:<instance>[/<object>:<instance>]...`
//!
//! A segment is split at its first `:`, so instance names may themselves
//! contain colons (`interface:eth0:1`). A segment without `:` has an empty
//! instance name.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One `<sub_id>:<instance>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub sub_id: String,
    pub instance: String,
}

/// A parsed instance identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oid {
    /// Test agent name from the root segment.
    pub agent: String,
    /// Segments below the root.
    pub segments: Vec<Segment>,
}

impl Oid {
    /// Sub-ids below the root, in order.
    pub fn sub_ids(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.sub_id.as_str()).collect()
    }

    /// Instance name at depth `depth` below the root.
    pub fn instance(&self, depth: usize) -> Option<&str> {
        self.segments.get(depth).map(|s| s.instance.as_str())
    }

    /// Instance name of the deepest segment.
    pub fn leaf(&self) -> &str {
        self.segments
            .last()
            .map(|s| s.instance.as_str())
            .unwrap_or_default()
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::InvalidFormat(format!("invalid object identifier: {}", s));

        let rest = s.strip_prefix('/').ok_or_else(bad)?;
        let mut parts = rest.split('/').map(|part| {
            let (sub_id, instance) = part.split_once(':').unwrap_or((part, ""));
            if sub_id.is_empty() {
                return Err(bad());
            }
            Ok(Segment {
                sub_id: sub_id.to_owned(),
                instance: instance.to_owned(),
            })
        });

        let root = parts.next().ok_or_else(bad)??;
        if root.sub_id != "agent" {
            return Err(bad());
        }
        let segments = parts.collect::<Result<Vec<_>>>()?;
        Ok(Self {
            agent: root.instance,
            segments,
        })
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/agent:{}", self.agent)?;
        for seg in &self.segments {
            write!(f, "/{}:{}", seg.sub_id, seg.instance)?;
        }
        Ok(())
    }
}
