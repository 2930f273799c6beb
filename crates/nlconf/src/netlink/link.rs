//! Link state changes and 802.1Q VLAN creation.

use super::connection::{Connection, ack_request, create_request};
use super::error::Result;
use super::message::rtm;
use super::types::{IfInfoMsg, ifla};

impl Connection {
    /// Set or clear interface flags selected by `mask`.
    pub async fn set_link_flags(&self, index: u32, flags: u32, mask: u32) -> Result<()> {
        let mut builder = ack_request(rtm::NEWLINK);
        builder.append(&IfInfoMsg::for_index(index).with_flags(flags, mask));
        self.request_ack(builder).await
    }

    /// Set the interface MTU.
    pub async fn set_link_mtu(&self, index: u32, mtu: u32) -> Result<()> {
        let mut builder = ack_request(rtm::NEWLINK);
        builder.append(&IfInfoMsg::for_index(index));
        builder.append_attr_u32(ifla::MTU, mtu);
        self.request_ack(builder).await
    }

    /// Create VLAN `vid` named `name` on top of the link with index `parent`.
    pub async fn add_vlan(&self, name: &str, parent: u32, vid: u16) -> Result<()> {
        let mut builder = create_request(rtm::NEWLINK);
        builder.append(&IfInfoMsg::default());
        builder.append_attr_str(ifla::IFNAME, name);
        builder.append_attr_u32(ifla::LINK, parent);

        let linkinfo = builder.nest_start(ifla::LINKINFO);
        builder.append_attr_str(ifla::INFO_KIND, "vlan");
        let data = builder.nest_start(ifla::INFO_DATA);
        builder.append_attr_u16(ifla::VLAN_ID, vid);
        builder.nest_end(data);
        builder.nest_end(linkinfo);

        self.request_ack(builder).await
    }

    /// Delete a link.
    pub async fn del_link(&self, index: u32) -> Result<()> {
        let mut builder = ack_request(rtm::DELLINK);
        builder.append(&IfInfoMsg::for_index(index));
        self.request_ack(builder).await
    }
}
