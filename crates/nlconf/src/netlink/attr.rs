//! Attribute (`rtattr`) framing.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};

pub const NLA_ALIGNTO: usize = 4;

#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

pub const NLA_HDRLEN: usize = 4;

pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// `struct rtattr`; `nla_len` counts the header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    pub nla_len: u16,
    pub nla_type: u16,
}

impl NlAttr {
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Type with the nested and byte-order flags masked off.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }
}

/// Walks `(type, payload)` pairs. A malformed length ends the walk.
pub struct AttrIter<'a> {
    rest: &'a [u8],
}

impl<'a> AttrIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (attr, _) = NlAttr::ref_from_prefix(self.rest).ok()?;
        let len = attr.nla_len as usize;
        if !(NLA_HDRLEN..=self.rest.len()).contains(&len) {
            self.rest = &[];
            return None;
        }

        let payload = &self.rest[NLA_HDRLEN..len];
        self.rest = self.rest.get(nla_align(len)..).unwrap_or(&[]);
        Some((attr.kind(), payload))
    }
}

/// Typed views of attribute payloads.
pub mod get {
    use std::net::Ipv4Addr;

    use super::*;

    fn fixed<const N: usize>(data: &[u8], what: &str) -> Result<[u8; N]> {
        data.get(..N)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::InvalidAttribute(format!("truncated {} attribute", what)))
    }

    /// Host-order u32.
    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        fixed(data, "u32").map(u32::from_ne_bytes)
    }

    pub fn ipv4(data: &[u8]) -> Result<Ipv4Addr> {
        fixed::<4>(data, "IPv4").map(Ipv4Addr::from)
    }

    /// Ethernet address; other link types yield `None`.
    pub fn mac(data: &[u8]) -> Option<[u8; 6]> {
        data.try_into().ok()
    }

    /// String up to the first NUL.
    pub fn string(data: &[u8]) -> Result<&str> {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..end])
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_walks_aligned_attrs() {
        // type 3 "lo\0" (len 7, padded to 8), then type 4 u32 1500
        let mut buf = Vec::new();
        buf.extend_from_slice(NlAttr::new(3, 3).as_bytes());
        buf.extend_from_slice(&[b'l', b'o', 0, 0]);
        buf.extend_from_slice(NlAttr::new(4, 4).as_bytes());
        buf.extend_from_slice(&1500u32.to_ne_bytes());

        let attrs: Vec<_> = AttrIter::new(&buf).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].0, 3);
        assert_eq!(get::string(attrs[0].1).unwrap(), "lo");
        assert_eq!(get::u32_ne(attrs[1].1).unwrap(), 1500);
    }

    #[test]
    fn test_iter_strips_nested_flag() {
        let mut buf = [0u8; 4];
        buf[..2].copy_from_slice(&4u16.to_ne_bytes());
        buf[2..].copy_from_slice(&(8 | NLA_F_NESTED).to_ne_bytes());
        let (kind, data) = AttrIter::new(&buf).next().unwrap();
        assert_eq!(kind, 8);
        assert!(data.is_empty());
    }

    #[test]
    fn test_iter_stops_on_bad_length() {
        let buf = [200, 0, 1, 0, 0, 0, 0, 0];
        assert_eq!(AttrIter::new(&buf).count(), 0);
    }

    #[test]
    fn test_get_truncated() {
        assert!(get::u32_ne(&[1, 2]).is_err());
        assert!(get::ipv4(&[10, 0]).is_err());
        assert_eq!(get::mac(&[1, 2, 3]), None);
    }
}
