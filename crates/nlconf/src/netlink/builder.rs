//! Request encoding: a header, a fixed family struct, then attributes.

use std::net::Ipv4Addr;

use zerocopy::{Immutable, IntoBytes};

use super::attr::{NLA_F_NESTED, NlAttr, nla_align};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Open nested attribute; close it with [`MessageBuilder::nest_end`].
#[derive(Debug, Clone, Copy)]
#[must_use = "a nest must be closed with nest_end"]
pub struct NestToken {
    at: usize,
}

/// One netlink request under construction.
///
/// The header is kept apart from the body so the sequence number and port
/// can be stamped just before sending; `nlmsg_len` is filled in by
/// [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: NlMsgHdr,
    body: Vec<u8>,
}

impl MessageBuilder {
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            header: NlMsgHdr::new(msg_type, flags),
            body: Vec::new(),
        }
    }

    /// Append a family header (`rtmsg`, `ifaddrmsg`, ...).
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) {
        self.append_bytes(data.as_bytes());
    }

    pub fn append_bytes(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
        self.pad(nlmsg_align);
    }

    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) {
        self.body
            .extend_from_slice(NlAttr::new(attr_type, data.len()).as_bytes());
        self.body.extend_from_slice(data);
        self.pad(nla_align);
    }

    pub fn append_attr_u16(&mut self, attr_type: u16, value: u16) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Address in network order.
    pub fn append_attr_ipv4(&mut self, attr_type: u16, addr: Ipv4Addr) {
        self.append_attr(attr_type, &addr.octets());
    }

    /// NUL-terminated string.
    pub fn append_attr_str(&mut self, attr_type: u16, value: &str) {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        self.append_attr(attr_type, &data);
    }

    pub fn nest_start(&mut self, attr_type: u16) -> NestToken {
        let at = self.body.len();
        self.body
            .extend_from_slice(NlAttr::new(attr_type | NLA_F_NESTED, 0).as_bytes());
        NestToken { at }
    }

    /// Patch the nest length now that its children are written.
    pub fn nest_end(&mut self, token: NestToken) {
        let len = (self.body.len() - token.at) as u16;
        self.body[token.at..token.at + 2].copy_from_slice(&len.to_ne_bytes());
        self.pad(nla_align);
    }

    pub fn set_seq(&mut self, seq: u32) {
        self.header.nlmsg_seq = seq;
    }

    pub fn set_pid(&mut self, pid: u32) {
        self.header.nlmsg_pid = pid;
    }

    /// Encode the request.
    pub fn finish(mut self) -> Vec<u8> {
        self.header.nlmsg_len = (NLMSG_HDRLEN + self.body.len()) as u32;
        let mut msg = Vec::with_capacity(NLMSG_HDRLEN + self.body.len());
        msg.extend_from_slice(self.header.as_bytes());
        msg.resize(NLMSG_HDRLEN, 0);
        msg.extend_from_slice(&self.body);
        msg
    }

    fn pad(&mut self, align: fn(usize) -> usize) {
        self.body.resize(align(self.body.len()), 0);
    }
}
