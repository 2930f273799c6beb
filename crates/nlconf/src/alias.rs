//! Alias slot allocation for `ethX:N` sub-interfaces.
//!
//! Slots are tracked in a 32-bit bitmap rebuilt from the live interface
//! names on every allocation; nothing is cached between calls.

use crate::error::{Error, Result};

/// Number of alias slots per interface.
pub const MAX_ALIASES: u32 = 32;

/// Alias suffix of `name` if it is `base` followed by `:` and digits.
pub fn alias_slot(name: &str, base: &str) -> Option<u32> {
    let suffix = name.strip_prefix(base)?.strip_prefix(':')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Suffixes too large for u32 are aliases that occupy no slot.
    Some(suffix.parse().unwrap_or(u32::MAX))
}

/// Check if `name` is an alias of `base`.
pub fn is_alias_of(name: &str, base: &str) -> bool {
    alias_slot(name, base).is_some()
}

/// Name of alias `slot` on `base`.
pub fn alias_name(base: &str, slot: u32) -> String {
    format!("{}:{}", base, slot)
}

/// Lowest free alias slot of `base`, given every interface name present.
pub fn allocate_slot<'a, I>(names: I, base: &str) -> Result<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let used = names
        .into_iter()
        .filter_map(|name| alias_slot(name, base))
        .filter(|&slot| slot < MAX_ALIASES)
        .fold(0u32, |bits, slot| bits | (1 << slot));

    if used == u32::MAX {
        return Err(Error::ResourceExhausted(format!(
            "all {} alias slots of {} are in use",
            MAX_ALIASES, base
        )));
    }
    Ok(used.trailing_ones())
}
