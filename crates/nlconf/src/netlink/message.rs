//! Netlink framing: the `nlmsghdr` layout, the rtnetlink message types the
//! agent sends, and splitting a received datagram into frames.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};

/// Frames are padded to 4 bytes.
pub const NLMSG_ALIGNTO: usize = 4;

#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// `struct nlmsghdr`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Frame length, header included.
    pub nlmsg_len: u32,
    pub nlmsg_type: u16,
    pub nlmsg_flags: u16,
    pub nlmsg_seq: u32,
    /// Port of the sender; 0 for the kernel.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Header of an empty frame.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            ..Self::default()
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(hdr, _)| hdr)
            .map_err(|_| Error::Truncated {
                expected: NLMSG_HDRLEN,
                actual: data.len(),
            })
    }
}

/// Control message types.
pub mod nlmsg {
    pub const ERROR: u16 = 2;
    pub const DONE: u16 = 3;
}

/// rtnetlink message types for the four families the agent manages.
pub mod rtm {
    pub const NEWLINK: u16 = 16;
    pub const DELLINK: u16 = 17;
    pub const GETLINK: u16 = 18;

    pub const NEWADDR: u16 = 20;
    pub const DELADDR: u16 = 21;
    pub const GETADDR: u16 = 22;

    pub const NEWROUTE: u16 = 24;
    pub const DELROUTE: u16 = 25;
    pub const GETROUTE: u16 = 26;

    pub const NEWNEIGH: u16 = 28;
    pub const DELNEIGH: u16 = 29;
    pub const GETNEIGH: u16 = 30;
}

/// `nlmsg_flags` bits.
pub mod nlm_f {
    pub const REQUEST: u16 = 0x01;
    pub const MULTI: u16 = 0x02;
    pub const ACK: u16 = 0x04;

    // GET modifiers
    pub const ROOT: u16 = 0x100;
    pub const MATCH: u16 = 0x200;
    pub const DUMP: u16 = ROOT | MATCH;

    // NEW modifiers
    pub const REPLACE: u16 = 0x100;
    pub const EXCL: u16 = 0x200;
    pub const CREATE: u16 = 0x400;
}

/// Payload of an `NLMSG_ERROR` frame: the (negated) errno and the header
/// of the request it answers.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
struct ErrorPayload {
    error: i32,
    request: NlMsgHdr,
}

/// What a received frame means for the request waiting on it.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameKind<'a> {
    /// Reply data.
    Data(&'a [u8]),
    /// `NLMSG_ERROR` with a zero code.
    Ack,
    /// `NLMSG_ERROR` carrying a positive errno.
    Error(i32),
    /// End of a dump.
    Done,
}

/// One frame out of a datagram.
#[derive(Debug)]
pub struct Frame<'a> {
    pub header: &'a NlMsgHdr,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn seq(&self) -> u32 {
        self.header.nlmsg_seq
    }

    /// Classify the frame; an error frame too short for its payload is
    /// reported as truncated.
    pub fn kind(&self) -> Result<FrameKind<'a>> {
        Ok(match self.header.nlmsg_type {
            nlmsg::DONE => FrameKind::Done,
            nlmsg::ERROR => {
                let (err, _) = ErrorPayload::ref_from_prefix(self.payload).map_err(|_| {
                    Error::Truncated {
                        expected: std::mem::size_of::<ErrorPayload>(),
                        actual: self.payload.len(),
                    }
                })?;
                match err.error {
                    0 => FrameKind::Ack,
                    code => FrameKind::Error(-code),
                }
            }
            _ => FrameKind::Data(self.payload),
        })
    }
}

/// Splits a datagram into frames. A frame whose length field is out of
/// bounds ends the iteration after yielding an error.
pub struct Frames<'a> {
    rest: &'a [u8],
}

impl<'a> Frames<'a> {
    pub fn new(datagram: &'a [u8]) -> Self {
        Self { rest: datagram }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<Frame<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.len() < NLMSG_HDRLEN {
            return None;
        }
        let header = match NlMsgHdr::from_bytes(self.rest) {
            Ok(header) => header,
            Err(e) => return Some(Err(e)),
        };

        let len = header.nlmsg_len as usize;
        if !(NLMSG_HDRLEN..=self.rest.len()).contains(&len) {
            self.rest = &[];
            return Some(Err(Error::InvalidMessage(format!(
                "frame length {} out of bounds",
                len
            ))));
        }

        let payload = &self.rest[NLMSG_HDRLEN..len];
        self.rest = self.rest.get(nlmsg_align(len)..).unwrap_or(&[]);
        Some(Ok(Frame { header, payload }))
    }
}
