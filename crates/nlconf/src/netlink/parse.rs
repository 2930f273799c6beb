//! winnow-based parsing of rtnetlink dump replies.

use winnow::binary::le_u16;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::attr::nla_align;
use super::error::{Error, Result};

/// Result type for winnow parsers.
pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

/// Types that can be parsed from the payload of one netlink message.
pub trait FromNetlink: Sized {
    /// Parse from a mutable byte slice reference, advancing it.
    fn parse(input: &mut &[u8]) -> PResult<Self>;

    /// Parse from a complete payload.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut input = data;
        Self::parse(&mut input).map_err(|e| Error::Parse(format!("{:?}", e)))
    }

    /// Write the fixed header a dump request for this type needs.
    fn write_dump_header(buf: &mut Vec<u8>);
}

/// A fatal parse error.
pub fn cut() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

/// Parse a fixed-size kernel header.
pub fn parse_header<T>(input: &mut &[u8]) -> PResult<T>
where
    T: FromBytes + IntoBytes + Immutable + KnownLayout,
{
    let size = std::mem::size_of::<T>();
    if input.len() < size {
        return Err(cut());
    }
    let bytes: &[u8] = take(size).parse_next(input)?;
    T::read_from_bytes(bytes).map_err(|_| cut())
}

/// Parse one attribute, returning (type without flags, payload).
///
/// Returns `None` once the remaining input cannot hold another attribute.
pub fn parse_attr<'a>(input: &mut &'a [u8]) -> PResult<Option<(u16, &'a [u8])>> {
    if input.len() < 4 {
        return Ok(None);
    }

    let len = le_u16.parse_next(input)? as usize;
    let attr_type = le_u16.parse_next(input)?;

    let payload_len = len.saturating_sub(4);
    if len < 4 || input.len() < payload_len {
        return Ok(None);
    }
    let payload: &[u8] = take(payload_len).parse_next(input)?;

    let padding = nla_align(len) - len;
    if input.len() >= padding {
        let _: &[u8] = take(padding).parse_next(input)?;
    }

    Ok(Some((attr_type & 0x3FFF, payload)))
}
