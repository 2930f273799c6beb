//! Address parsing and formatting utilities.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Parse a MAC address from `xx:xx:xx:xx:xx:xx`.
pub fn parse_mac(s: &str) -> Result<[u8; 6]> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return Err(Error::InvalidValue(format!("invalid MAC address: {}", s)));
    }

    let mut mac = [0u8; 6];
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || part.len() > 2 {
            return Err(Error::InvalidValue(format!("invalid MAC address: {}", s)));
        }
        mac[i] = u8::from_str_radix(part, 16)
            .map_err(|_| Error::InvalidValue(format!("invalid MAC address: {}", s)))?;
    }

    Ok(mac)
}

/// Format a MAC address in lowercase.
pub fn format_mac(mac: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

/// Netmask for a prefix length (0..=32).
pub fn prefix_mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p if p >= 32 => u32::MAX,
        p => u32::MAX << (32 - p),
    }
}

/// Check if `addr` falls inside `net/prefix`.
pub fn ipv4_in_prefix(addr: Ipv4Addr, net: Ipv4Addr, prefix: u8) -> bool {
    let mask = prefix_mask(prefix);
    u32::from(addr) & mask == u32::from(net) & mask
}

/// Strip an alias suffix: `eth0:3` becomes `eth0`.
pub fn base_ifname(name: &str) -> &str {
    name.split_once(':').map_or(name, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac() {
        assert_eq!(
            parse_mac("00:1A:2b:3c:4d:5e").unwrap(),
            [0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]
        );
        assert!(parse_mac("00:11:22:33:44").is_err());
        assert!(parse_mac("00:11:22:33:44:zz").is_err());
        assert!(parse_mac("00:11:22:33:44:555").is_err());
    }

    #[test]
    fn test_format_mac_lowercase() {
        assert_eq!(
            format_mac(&[0xAA, 0xBB, 0x0C, 0, 1, 0xFF]),
            "aa:bb:0c:00:01:ff"
        );
    }

    #[test]
    fn test_prefix_mask() {
        assert_eq!(prefix_mask(0), 0);
        assert_eq!(prefix_mask(8), 0xFF00_0000);
        assert_eq!(prefix_mask(24), 0xFFFF_FF00);
        assert_eq!(prefix_mask(32), u32::MAX);
    }

    #[test]
    fn test_in_prefix() {
        let net = Ipv4Addr::new(10, 0, 0, 0);
        assert!(ipv4_in_prefix(Ipv4Addr::new(10, 0, 0, 5), net, 24));
        assert!(!ipv4_in_prefix(Ipv4Addr::new(10, 0, 1, 5), net, 24));
        assert!(ipv4_in_prefix(Ipv4Addr::new(192, 168, 1, 1), net, 0));
    }

    #[test]
    fn test_base_ifname() {
        assert_eq!(base_ifname("eth0:3"), "eth0");
        assert_eq!(base_ifname("eth0.5"), "eth0.5");
    }
}
