//! Request/reply exchange over one rtnetlink socket.

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{FrameKind, Frames, nlm_f, rtm};
use super::messages::{AddressMessage, LinkMessage, NeighborMessage, RouteMessage};
use super::parse::FromNetlink;
use super::socket::NetlinkSocket;
use super::types::AF_INET;

/// rtnetlink connection. Link, address, route and neighbor requests live in
/// the sibling modules as `impl Connection` blocks.
pub struct Connection {
    socket: NetlinkSocket,
}

impl Connection {
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new()?,
        })
    }

    /// Send `builder` and feed every data frame answering it to `on_data`
    /// until the kernel ends the exchange. An ACK ends a plain request,
    /// `NLMSG_DONE` ends a dump.
    async fn exchange(
        &self,
        mut builder: MessageBuilder,
        mut on_data: impl FnMut(&[u8]),
    ) -> Result<()> {
        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());
        self.socket.send(&builder.finish()).await?;

        loop {
            let datagram = self.socket.recv_msg().await?;
            for frame in Frames::new(&datagram) {
                let frame = frame?;
                if frame.seq() != seq {
                    continue;
                }
                match frame.kind()? {
                    FrameKind::Data(payload) => on_data(payload),
                    FrameKind::Ack | FrameKind::Done => return Ok(()),
                    FrameKind::Error(errno) => return Err(Error::kernel(errno)),
                }
            }
        }
    }

    /// Send a request that is answered by an ACK only.
    pub async fn request_ack(&self, builder: MessageBuilder) -> Result<()> {
        self.exchange(builder, |_| {}).await
    }

    /// Send a dump request and collect the payload of every reply.
    pub async fn dump(&self, builder: MessageBuilder) -> Result<Vec<Vec<u8>>> {
        let mut replies = Vec::new();
        self.exchange(builder, |payload| replies.push(payload.to_vec()))
            .await?;
        Ok(replies)
    }

    /// Dump `msg_type` and parse the replies. Replies that fail to parse
    /// are skipped.
    pub async fn dump_typed<T: FromNetlink>(&self, msg_type: u16) -> Result<Vec<T>> {
        let mut builder = dump_request(msg_type);
        let mut header = Vec::new();
        T::write_dump_header(&mut header);
        builder.append_bytes(&header);

        let replies = self.dump(builder).await?;
        Ok(replies
            .iter()
            .filter_map(|payload| match T::from_bytes(payload) {
                Ok(msg) => Some(msg),
                Err(e) => {
                    tracing::debug!("skipping unparsable dump reply: {}", e);
                    None
                }
            })
            .collect())
    }

    pub async fn get_links(&self) -> Result<Vec<LinkMessage>> {
        self.dump_typed(rtm::GETLINK).await
    }

    /// Link named `name`, or `None`.
    pub async fn get_link_by_name(&self, name: &str) -> Result<Option<LinkMessage>> {
        let links = self.get_links().await?;
        Ok(links.into_iter().find(|l| l.name.as_deref() == Some(name)))
    }

    /// IPv4 addresses only.
    pub async fn get_addresses(&self) -> Result<Vec<AddressMessage>> {
        let addresses: Vec<AddressMessage> = self.dump_typed(rtm::GETADDR).await?;
        Ok(addresses.into_iter().filter(|a| a.is_ipv4()).collect())
    }

    /// IPv4 routes of every table.
    pub async fn get_routes(&self) -> Result<Vec<RouteMessage>> {
        let routes: Vec<RouteMessage> = self.dump_typed(rtm::GETROUTE).await?;
        Ok(routes.into_iter().filter(|r| r.is_ipv4()).collect())
    }

    /// IPv4 neighbor entries.
    pub async fn get_neighbors(&self) -> Result<Vec<NeighborMessage>> {
        let neighbors: Vec<NeighborMessage> = self.dump_typed(rtm::GETNEIGH).await?;
        Ok(neighbors
            .into_iter()
            .filter(|n| n.header.ndm_family == AF_INET)
            .collect())
    }
}

pub fn dump_request(msg_type: u16) -> MessageBuilder {
    MessageBuilder::new(msg_type, nlm_f::REQUEST | nlm_f::DUMP)
}

pub fn ack_request(msg_type: u16) -> MessageBuilder {
    MessageBuilder::new(msg_type, nlm_f::REQUEST | nlm_f::ACK)
}

/// Create request; the kernel rejects it with EEXIST if the object exists.
pub fn create_request(msg_type: u16) -> MessageBuilder {
    MessageBuilder::new(
        msg_type,
        nlm_f::REQUEST | nlm_f::ACK | nlm_f::CREATE | nlm_f::EXCL,
    )
}

pub fn replace_request(msg_type: u16) -> MessageBuilder {
    MessageBuilder::new(
        msg_type,
        nlm_f::REQUEST | nlm_f::ACK | nlm_f::CREATE | nlm_f::REPLACE,
    )
}
