//! NETLINK_ROUTE socket driven by the tokio reactor.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::Result;

/// Dump replies arrive in datagrams of at most a page or two; this holds
/// the largest the kernel sends by default.
const RECV_BUF_SIZE: usize = 32768;

pub struct NetlinkSocket {
    fd: AsyncFd<Socket>,
    seq: AtomicU32,
    port: u32,
}

impl NetlinkSocket {
    /// Open a non-blocking socket bound to a kernel-assigned port.
    pub fn new() -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_ROUTE)?;
        socket.set_non_blocking(true)?;

        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;

        // Not every kernel knows NETLINK_EXT_ACK.
        let _ = socket.set_ext_ack(true);

        Ok(Self {
            port: addr.port_number(),
            fd: AsyncFd::new(socket)?,
            seq: AtomicU32::new(1),
        })
    }

    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Port the kernel bound us to.
    pub fn pid(&self) -> u32 {
        self.port
    }

    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        self.io(Interest::WRITABLE, |socket| socket.send(msg, 0))
            .await?;
        Ok(())
    }

    /// Receive one datagram.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(RECV_BUF_SIZE);
        self.io(Interest::READABLE, |socket| socket.recv(&mut buf, 0))
            .await?;
        Ok(buf.to_vec())
    }

    /// Retry `op` until it stops returning `WouldBlock`.
    async fn io<T>(
        &self,
        interest: Interest,
        mut op: impl FnMut(&Socket) -> io::Result<T>,
    ) -> io::Result<T> {
        loop {
            let mut guard = self.fd.ready(interest).await?;
            if let Ok(result) = guard.try_io(|inner| op(inner.get_ref())) {
                return result;
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}
