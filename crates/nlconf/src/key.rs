//! Instance-name codec.
//!
//! Routes are named `<dst>|<prefix>` followed by optional comma-separated
//! fields in any order:
//!
//! ```text
//! 10.1.0.0|16,gw=10.0.0.1,dev=eth0,metric=5,mss=1400,window=8192,irtt=30,reject
//! ```
//!
//! Encoding always emits fields in the order above, so
//! `decode_route(&encode_route(&k)) == k` for every key without route flags.
//!
//! Address and ARP instances are plain dotted quads; the helpers at the
//! bottom of this module decode and validate them.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::util::prefix_mask;

/// Which optional fields of a [`RouteKey`] are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RouteFields(u8);

impl RouteFields {
    pub const GATEWAY: Self = Self(1 << 0);
    pub const DEV: Self = Self(1 << 1);
    pub const METRIC: Self = Self(1 << 2);
    pub const MSS: Self = Self(1 << 3);
    pub const WINDOW: Self = Self(1 << 4);
    pub const IRTT: Self = Self(1 << 5);
    pub const REJECT: Self = Self(1 << 6);

    /// No optional field.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// Kernel route flags the agent reads and sets: modified, dynamic and
/// reinstate. They are route state, not part of the instance name.
///
/// As an object value they are space-separated words: `mod dyn reinstate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RouteFlags(u8);

impl RouteFlags {
    pub const MODIFIED: Self = Self(1 << 0);
    pub const DYNAMIC: Self = Self(1 << 1);
    pub const REINSTATE: Self = Self(1 << 2);

    const WORDS: [(Self, &'static str); 3] = [
        (Self::MODIFIED, "mod"),
        (Self::DYNAMIC, "dyn"),
        (Self::REINSTATE, "reinstate"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Parse a flags value. Words may repeat and come in any order; an
    /// unknown word is `InvalidValue`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut flags = Self::empty();
        for word in text.split_whitespace() {
            let (flag, _) = Self::WORDS
                .iter()
                .find(|(_, name)| *name == word)
                .ok_or_else(|| Error::InvalidValue(format!("unknown route flag '{}'", word)))?;
            flags.insert(*flag);
        }
        Ok(flags)
    }
}

impl fmt::Display for RouteFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for (flag, name) in Self::WORDS {
            if self.contains(flag) {
                write!(f, "{}{}", sep, name)?;
                sep = " ";
            }
        }
        Ok(())
    }
}

/// A decoded route instance name.
///
/// Absent fields hold their zero value, so two keys compare equal exactly
/// when they encode to the same string and carry the same [`RouteFlags`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    dst: Ipv4Addr,
    prefix: u8,
    fields: RouteFields,
    gateway: Ipv4Addr,
    dev: String,
    metric: u32,
    mss: u32,
    window: u32,
    irtt: u32,
    flags: RouteFlags,
}

impl RouteKey {
    /// Create a key for `dst/prefix` with no optional fields.
    ///
    /// Fails with `InvalidFormat` if `prefix > 32`.
    pub fn new(dst: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::InvalidFormat(format!(
                "route prefix {} out of range",
                prefix
            )));
        }
        Ok(Self {
            dst,
            prefix,
            fields: RouteFields::empty(),
            gateway: Ipv4Addr::UNSPECIFIED,
            dev: String::new(),
            metric: 0,
            mss: 0,
            window: 0,
            irtt: 0,
            flags: RouteFlags::empty(),
        })
    }

    pub fn dst(&self) -> Ipv4Addr {
        self.dst
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Presence mask of the optional fields.
    pub fn fields(&self) -> RouteFields {
        self.fields
    }

    pub fn gateway(&self) -> Option<Ipv4Addr> {
        self.fields
            .contains(RouteFields::GATEWAY)
            .then_some(self.gateway)
    }

    pub fn dev(&self) -> Option<&str> {
        self.fields
            .contains(RouteFields::DEV)
            .then_some(self.dev.as_str())
    }

    pub fn metric(&self) -> Option<u32> {
        self.fields.contains(RouteFields::METRIC).then_some(self.metric)
    }

    pub fn mss(&self) -> Option<u32> {
        self.fields.contains(RouteFields::MSS).then_some(self.mss)
    }

    pub fn window(&self) -> Option<u32> {
        self.fields.contains(RouteFields::WINDOW).then_some(self.window)
    }

    pub fn irtt(&self) -> Option<u32> {
        self.fields.contains(RouteFields::IRTT).then_some(self.irtt)
    }

    pub fn is_reject(&self) -> bool {
        self.fields.contains(RouteFields::REJECT)
    }

    pub fn flags(&self) -> RouteFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: RouteFlags) {
        self.flags = flags;
    }

    /// Set or clear the gateway.
    pub fn set_gateway(&mut self, gateway: Option<Ipv4Addr>) {
        self.gateway = self.toggle(RouteFields::GATEWAY, gateway, Ipv4Addr::UNSPECIFIED);
    }

    /// Set or clear the output device.
    ///
    /// An empty name or one containing `,` cannot be encoded and is
    /// `InvalidFormat`.
    pub fn set_dev(&mut self, dev: Option<&str>) -> Result<()> {
        if let Some(name) = dev
            && (name.is_empty() || name.contains(','))
        {
            return Err(Error::InvalidFormat(format!(
                "invalid route device '{}'",
                name
            )));
        }
        self.dev = self.toggle(RouteFields::DEV, dev.map(str::to_owned), String::new());
        Ok(())
    }

    pub fn set_metric(&mut self, metric: Option<u32>) {
        self.metric = self.toggle(RouteFields::METRIC, metric, 0);
    }

    pub fn set_mss(&mut self, mss: Option<u32>) {
        self.mss = self.toggle(RouteFields::MSS, mss, 0);
    }

    pub fn set_window(&mut self, window: Option<u32>) {
        self.window = self.toggle(RouteFields::WINDOW, window, 0);
    }

    pub fn set_irtt(&mut self, irtt: Option<u32>) {
        self.irtt = self.toggle(RouteFields::IRTT, irtt, 0);
    }

    pub fn set_reject(&mut self, reject: bool) {
        if reject {
            self.fields.insert(RouteFields::REJECT);
        } else {
            self.fields.remove(RouteFields::REJECT);
        }
    }

    fn toggle<T>(&mut self, field: RouteFields, value: Option<T>, zero: T) -> T {
        match value {
            Some(v) => {
                self.fields.insert(field);
                v
            }
            None => {
                self.fields.remove(field);
                zero
            }
        }
    }

    /// Builder form of [`set_gateway`](Self::set_gateway).
    pub fn with_gateway(mut self, gateway: Ipv4Addr) -> Self {
        self.set_gateway(Some(gateway));
        self
    }

    /// Builder form of [`set_metric`](Self::set_metric).
    pub fn with_metric(mut self, metric: u32) -> Self {
        self.set_metric(Some(metric));
        self
    }

    /// Check if the live route `other` is the route this key names.
    ///
    /// Destination and prefix must be equal, and so must every optional
    /// field this key carries. An attribute missing from `other` counts as
    /// 0. Route flags are not compared.
    pub fn matches(&self, other: &RouteKey) -> bool {
        let attr = |mine: Option<u32>, theirs: Option<u32>| {
            mine.is_none_or(|v| theirs.unwrap_or(0) == v)
        };
        self.dst == other.dst
            && self.prefix == other.prefix
            && self.gateway().is_none_or(|gw| other.gateway() == Some(gw))
            && self.dev().is_none_or(|dev| other.dev() == Some(dev))
            && attr(self.metric(), other.metric())
            && attr(self.mss(), other.mss())
            && attr(self.window(), other.window())
            && attr(self.irtt(), other.irtt())
            && (!self.is_reject() || other.is_reject())
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.dst, self.prefix)?;
        if let Some(gw) = self.gateway() {
            write!(f, ",gw={}", gw)?;
        }
        if let Some(dev) = self.dev() {
            write!(f, ",dev={}", dev)?;
        }
        if let Some(metric) = self.metric() {
            write!(f, ",metric={}", metric)?;
        }
        if let Some(mss) = self.mss() {
            write!(f, ",mss={}", mss)?;
        }
        if let Some(window) = self.window() {
            write!(f, ",window={}", window)?;
        }
        if let Some(irtt) = self.irtt() {
            write!(f, ",irtt={}", irtt)?;
        }
        if self.is_reject() {
            f.write_str(",reject")?;
        }
        Ok(())
    }
}

impl FromStr for RouteKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_route(s)
    }
}

fn bad_route(text: &str, why: &str) -> Error {
    Error::InvalidFormat(format!("route '{}': {}", text, why))
}

fn parse_u32_field(text: &str, name: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| bad_route(text, &format!("{} is not a number", name)))
}

/// Decode a route instance name.
pub fn decode_route(text: &str) -> Result<RouteKey> {
    let (dst, rest) = text
        .split_once('|')
        .ok_or_else(|| bad_route(text, "missing '|'"))?;
    let dst = decode_ipv4(dst)?;

    let mut tokens = rest.split(',');
    let prefix = tokens.next().unwrap_or_default();
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| bad_route(text, "prefix is not a number"))?;
    if prefix > 32 {
        return Err(bad_route(text, "prefix out of range"));
    }

    let mut key = RouteKey::new(dst, prefix)?;

    for token in tokens {
        let (name, value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };

        let field = match name {
            "gw" => RouteFields::GATEWAY,
            "dev" => RouteFields::DEV,
            "metric" => RouteFields::METRIC,
            "mss" => RouteFields::MSS,
            "window" => RouteFields::WINDOW,
            "irtt" => RouteFields::IRTT,
            "reject" => RouteFields::REJECT,
            "" => return Err(bad_route(text, "empty field")),
            other => return Err(bad_route(text, &format!("unknown field '{}'", other))),
        };
        if key.fields.contains(field) {
            return Err(bad_route(text, &format!("duplicate field '{}'", name)));
        }

        match (field, value) {
            (RouteFields::REJECT, None) => key.set_reject(true),
            (RouteFields::REJECT, Some(_)) => {
                return Err(bad_route(text, "reject takes no value"));
            }
            (_, None) | (_, Some("")) => {
                return Err(bad_route(text, &format!("{} needs a value", name)));
            }
            (RouteFields::GATEWAY, Some(v)) => key.set_gateway(Some(decode_ipv4(v)?)),
            (RouteFields::DEV, Some(v)) => key.set_dev(Some(v))?,
            (RouteFields::METRIC, Some(v)) => {
                key.set_metric(Some(parse_u32_field(text, name, v)?));
            }
            (RouteFields::MSS, Some(v)) => key.set_mss(Some(parse_u32_field(text, name, v)?)),
            (RouteFields::WINDOW, Some(v)) => {
                key.set_window(Some(parse_u32_field(text, name, v)?));
            }
            (_, Some(v)) => key.set_irtt(Some(parse_u32_field(text, name, v)?)),
        }
    }

    Ok(key)
}

/// Encode a route key into its instance name.
pub fn encode_route(key: &RouteKey) -> String {
    key.to_string()
}

/// Decode a dotted-quad instance name.
pub fn decode_ipv4(text: &str) -> Result<Ipv4Addr> {
    text.parse()
        .map_err(|_| Error::InvalidFormat(format!("invalid IPv4 address: {}", text)))
}

/// Reject addresses that cannot be assigned to an interface: 0.0.0.0,
/// loopback (127/8) and everything from 224.0.0.0 up.
pub fn validate_unicast(addr: Ipv4Addr) -> Result<()> {
    let raw = u32::from(addr);
    if raw == 0 || addr.is_loopback() || raw >= 0xE000_0000 {
        return Err(Error::InvalidValue(format!(
            "{} is not a unicast address",
            addr
        )));
    }
    Ok(())
}

/// Classful default prefix: /8 for class A, /16 for B, /24 otherwise.
pub fn classful_prefix(addr: Ipv4Addr) -> u8 {
    match u32::from(addr) {
        a if a < 0x8000_0000 => 8,
        a if a < 0xC000_0000 => 16,
        _ => 24,
    }
}

/// Directed broadcast address of `addr/prefix`.
pub fn broadcast_for(addr: Ipv4Addr, prefix: u8) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(addr) | !prefix_mask(prefix))
}

/// Parse a prefix length given as an object value.
///
/// Empty text is 0. Non-numeric text is `InvalidFormat`; a number above 32
/// is `InvalidValue`.
pub fn parse_prefix_value(text: &str) -> Result<u8> {
    if text.is_empty() {
        return Ok(0);
    }
    let value: u32 = text
        .parse()
        .map_err(|_| Error::InvalidFormat(format!("invalid prefix length: {}", text)))?;
    if value > 32 {
        return Err(Error::InvalidValue(format!(
            "prefix length {} out of range",
            value
        )));
    }
    Ok(value as u8)
}
