//! Portable backend: ioctl sockets for changes, procfs and getifaddrs for
//! state, and `vconfig` for VLANs.
//!
//! Interfaces carry one IPv4 address each, so further addresses go on
//! numbered aliases (`eth0:N`).

use std::ffi::{CStr, CString};
use std::io;
use std::mem;
use std::net::Ipv4Addr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, error, warn};

use super::{
    Backend, LinkInfo, NeighborEntry, NetAddress, RouteChange, address_gone_ok, neighbor_gone_ok,
};
use crate::alias::{alias_name, allocate_slot};
use crate::config::HostPaths;
use crate::error::{Error, Result};
use crate::key::{RouteFlags, RouteKey, broadcast_for};
use crate::netlink::types::iff;
use crate::util::{base_ifname, format_mac, ipv4_in_prefix, parse_mac, prefix_mask};

// Socket ioctls (from linux/sockios.h)
const SIOCADDRT: libc::c_ulong = 0x890B;
const SIOCDELRT: libc::c_ulong = 0x890C;
const SIOCGIFFLAGS: libc::c_ulong = 0x8913;
const SIOCSIFFLAGS: libc::c_ulong = 0x8914;
const SIOCSIFADDR: libc::c_ulong = 0x8916;
const SIOCSIFBRDADDR: libc::c_ulong = 0x891A;
const SIOCSIFNETMASK: libc::c_ulong = 0x891C;
const SIOCGIFMTU: libc::c_ulong = 0x8921;
const SIOCSIFMTU: libc::c_ulong = 0x8922;
const SIOCGIFHWADDR: libc::c_ulong = 0x8927;
const SIOCGIFINDEX: libc::c_ulong = 0x8933;
const SIOCDARP: libc::c_ulong = 0x8953;
const SIOCSARP: libc::c_ulong = 0x8955;

// Route flags (from linux/route.h)
const RTF_UP: libc::c_ushort = 0x0001;
const RTF_GATEWAY: libc::c_ushort = 0x0002;
const RTF_HOST: libc::c_ushort = 0x0004;
const RTF_REINSTATE: libc::c_ushort = 0x0008;
const RTF_DYNAMIC: libc::c_ushort = 0x0010;
const RTF_MODIFIED: libc::c_ushort = 0x0020;
const RTF_MTU: libc::c_ushort = 0x0040;
const RTF_WINDOW: libc::c_ushort = 0x0080;
const RTF_IRTT: libc::c_ushort = 0x0100;
const RTF_REJECT: libc::c_ushort = 0x0200;
const RTF_STATIC: libc::c_ushort = 0x0400;

// ARP flags (from linux/if_arp.h)
const ATF_COM: libc::c_int = 0x02;
const ATF_PERM: libc::c_int = 0x04;
const ARPHRD_ETHER: libc::sa_family_t = 1;

/// struct rtentry
#[derive(Debug)]
#[repr(C)]
struct RtEntry {
    rt_pad1: libc::c_ulong,
    rt_dst: libc::sockaddr,
    rt_gateway: libc::sockaddr,
    rt_genmask: libc::sockaddr,
    rt_flags: libc::c_ushort,
    rt_pad2: libc::c_short,
    rt_pad3: libc::c_ulong,
    rt_pad4: *mut libc::c_void,
    rt_metric: libc::c_short,
    rt_dev: *mut libc::c_char,
    rt_mtu: libc::c_ulong,
    rt_window: libc::c_ulong,
    rt_irtt: libc::c_ushort,
}

/// struct arpreq
#[repr(C)]
struct ArpReq {
    arp_pa: libc::sockaddr,
    arp_ha: libc::sockaddr,
    arp_flags: libc::c_int,
    arp_netmask: libc::sockaddr,
    arp_dev: [libc::c_char; 16],
}

fn sockaddr_in(addr: Ipv4Addr) -> libc::sockaddr {
    let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_addr.s_addr = u32::from_ne_bytes(addr.octets());
    // SAFETY: sockaddr_in and sockaddr are both 16 bytes.
    unsafe { mem::transmute::<libc::sockaddr_in, libc::sockaddr>(sin) }
}

/// Read an IPv4 address out of a sockaddr pointer.
///
/// # Safety
///
/// `sa` must be null or point to a valid sockaddr.
unsafe fn sockaddr_ipv4(sa: *const libc::sockaddr) -> Option<Ipv4Addr> {
    if sa.is_null() {
        return None;
    }
    // SAFETY: non-null and valid per the caller; sockaddr_in fits when the
    // family is AF_INET.
    unsafe {
        if (*sa).sa_family as libc::c_int != libc::AF_INET {
            return None;
        }
        let sin = &*(sa as *const libc::sockaddr_in);
        Some(Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes()))
    }
}

fn copy_name(dst: &mut [libc::c_char], name: &str) -> Result<()> {
    if name.len() >= dst.len() {
        return Err(Error::InvalidValue(format!(
            "interface name too long: {}",
            name
        )));
    }
    for (d, s) in dst.iter_mut().zip(name.bytes()) {
        *d = s as libc::c_char;
    }
    Ok(())
}

fn ifreq(name: &str) -> Result<libc::ifreq> {
    let mut ifr: libc::ifreq = unsafe { mem::zeroed() };
    copy_name(&mut ifr.ifr_name, name)?;
    Ok(ifr)
}

/// AF_INET datagram socket used as the ioctl handle.
struct IoctlSocket(OwnedFd);

impl IoctlSocket {
    fn new() -> Result<Self> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, 0) };
        if fd < 0 {
            return Err(Error::from(io::Error::last_os_error()).with_context("socket"));
        }
        // SAFETY: fd is a freshly opened descriptor we own.
        Ok(Self(unsafe { OwnedFd::from_raw_fd(fd) }))
    }

    fn ioctl<T>(&self, request: libc::c_ulong, arg: &mut T, what: &str) -> Result<()> {
        let ret = unsafe { libc::ioctl(self.0.as_raw_fd(), request as _, arg as *mut T) };
        if ret < 0 {
            return Err(Error::from(io::Error::last_os_error()).with_context(what));
        }
        Ok(())
    }

    fn flags(&self, name: &str) -> Result<libc::c_short> {
        let mut ifr = ifreq(name)?;
        self.ioctl(SIOCGIFFLAGS, &mut ifr, &format!("SIOCGIFFLAGS {}", name))?;
        Ok(unsafe { ifr.ifr_ifru.ifru_flags })
    }

    fn update_flags(&self, name: &str, set: u32, clear: u32) -> Result<()> {
        let flags = self.flags(name)? as u16 as u32;
        let mut ifr = ifreq(name)?;
        ifr.ifr_ifru.ifru_flags = ((flags | set) & !clear) as libc::c_short;
        self.ioctl(SIOCSIFFLAGS, &mut ifr, &format!("SIOCSIFFLAGS {}", name))
    }

    fn set_addr(&self, request: libc::c_ulong, name: &str, addr: Ipv4Addr, what: &str) -> Result<()> {
        let mut ifr = ifreq(name)?;
        ifr.ifr_ifru.ifru_addr = sockaddr_in(addr);
        self.ioctl(request, &mut ifr, &format!("{} {} {}", what, name, addr))
    }

    fn link_info(&self, name: &str) -> Result<LinkInfo> {
        let flags = self.flags(name)? as u16 as u32;

        let mut ifr = ifreq(name)?;
        self.ioctl(SIOCGIFINDEX, &mut ifr, &format!("SIOCGIFINDEX {}", name))?;
        let index = unsafe { ifr.ifr_ifru.ifru_ifindex } as u32;

        let mut ifr = ifreq(name)?;
        self.ioctl(SIOCGIFMTU, &mut ifr, &format!("SIOCGIFMTU {}", name))?;
        let mtu = unsafe { ifr.ifr_ifru.ifru_mtu } as u32;

        let mut ifr = ifreq(name)?;
        self.ioctl(SIOCGIFHWADDR, &mut ifr, &format!("SIOCGIFHWADDR {}", name))?;
        let hw = unsafe { ifr.ifr_ifru.ifru_hwaddr };
        let address = (hw.sa_family == ARPHRD_ETHER).then(|| {
            let mut mac = [0u8; 6];
            for (m, b) in mac.iter_mut().zip(hw.sa_data.iter()) {
                *m = *b as u8;
            }
            mac
        });

        Ok(LinkInfo {
            name: name.to_owned(),
            index,
            mtu,
            flags,
            address,
        })
    }
}

/// IPv4 addresses from getifaddrs, labelled as the kernel reports them.
fn inet_addresses() -> Result<Vec<NetAddress>> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut head) } < 0 {
        return Err(Error::from(io::Error::last_os_error()).with_context("getifaddrs"));
    }

    let mut out = Vec::new();
    let mut cur = head;
    while !cur.is_null() {
        // SAFETY: getifaddrs returned a valid list that we free below.
        let ifa = unsafe { &*cur };
        cur = ifa.ifa_next;

        let Some(address) = (unsafe { sockaddr_ipv4(ifa.ifa_addr) }) else {
            continue;
        };
        let name = unsafe { CStr::from_ptr(ifa.ifa_name) }
            .to_string_lossy()
            .into_owned();
        let prefix = unsafe { sockaddr_ipv4(ifa.ifa_netmask) }
            .map_or(32, |mask| u32::from(mask).count_ones() as u8);
        let broadcast = if ifa.ifa_flags & libc::IFF_BROADCAST as libc::c_uint != 0 {
            unsafe { sockaddr_ipv4(ifa.ifa_ifu) }
        } else {
            None
        };

        out.push(NetAddress {
            link: base_ifname(&name).to_owned(),
            ifname: name,
            address,
            prefix,
            broadcast,
        });
    }

    unsafe { libc::freeifaddrs(head) };
    Ok(out)
}

const KERNEL_ROUTE_FLAGS: [(RouteFlags, libc::c_ushort); 3] = [
    (RouteFlags::MODIFIED, RTF_MODIFIED),
    (RouteFlags::DYNAMIC, RTF_DYNAMIC),
    (RouteFlags::REINSTATE, RTF_REINSTATE),
];

fn out_of_range(key: &RouteKey, what: &str, value: u32, max: u32) -> Error {
    Error::InvalidValue(format!(
        "{} {} of route {} exceeds {}",
        what, value, key, max
    ))
}

/// Fill a `struct rtentry` for `key`. A metric or irtt the structure
/// cannot hold is `InvalidValue`.
fn route_entry(key: &RouteKey, dev: Option<&CString>) -> Result<RtEntry> {
    let mut rt: RtEntry = unsafe { mem::zeroed() };
    rt.rt_dst = sockaddr_in(key.dst());
    rt.rt_genmask = sockaddr_in(Ipv4Addr::from(prefix_mask(key.prefix())));
    rt.rt_flags = RTF_UP | RTF_STATIC;

    if let Some(gw) = key.gateway() {
        rt.rt_gateway = sockaddr_in(gw);
        rt.rt_flags |= RTF_GATEWAY;
    }
    if key.prefix() == 32 {
        rt.rt_flags |= RTF_HOST;
    }
    if key.is_reject() {
        rt.rt_flags |= RTF_REJECT;
    }
    for (flag, bit) in KERNEL_ROUTE_FLAGS {
        if key.flags().contains(flag) {
            rt.rt_flags |= bit;
        }
    }
    // The kernel stores rt_metric - 1 as the route priority.
    if let Some(metric) = key.metric().filter(|&m| m != 0) {
        let max = libc::c_short::MAX as u32 - 1;
        if metric > max {
            return Err(out_of_range(key, "metric", metric, max));
        }
        rt.rt_metric = (metric + 1) as libc::c_short;
    }
    if let Some(mss) = key.mss() {
        rt.rt_mtu = mss as libc::c_ulong;
        rt.rt_flags |= RTF_MTU;
    }
    if let Some(window) = key.window() {
        rt.rt_window = window as libc::c_ulong;
        rt.rt_flags |= RTF_WINDOW;
    }
    if let Some(irtt) = key.irtt() {
        rt.rt_irtt = libc::c_ushort::try_from(irtt)
            .map_err(|_| out_of_range(key, "irtt", irtt, libc::c_ushort::MAX as u32))?;
        rt.rt_flags |= RTF_IRTT;
    }
    if let Some(dev) = dev {
        rt.rt_dev = dev.as_ptr() as *mut libc::c_char;
    }
    Ok(rt)
}

/// Interface names from /proc/net/dev.
fn parse_proc_dev(text: &str) -> Vec<String> {
    text.lines()
        .skip(2)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, _)| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect()
}

fn hex_ipv4(field: &str) -> Option<Ipv4Addr> {
    u32::from_str_radix(field, 16)
        .ok()
        .map(|raw| Ipv4Addr::from(raw.to_ne_bytes()))
}

/// Routes from /proc/net/route.
fn parse_proc_route(text: &str) -> Vec<RouteKey> {
    let mut routes = Vec::new();

    for line in text.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 11 {
            continue;
        }
        let (Some(dst), Some(gw), Some(mask)) = (hex_ipv4(cols[1]), hex_ipv4(cols[2]), hex_ipv4(cols[7]))
        else {
            continue;
        };
        let Ok(flags) = u16::from_str_radix(cols[3], 16) else {
            continue;
        };
        let Ok(mut key) = RouteKey::new(dst, u32::from(mask).count_ones() as u8) else {
            continue;
        };

        let nonzero = |s: &str| s.parse::<u32>().ok().filter(|&v| v != 0);
        if flags & RTF_GATEWAY != 0 {
            key.set_gateway(Some(gw));
        }
        if cols[0] != "*" && key.set_dev(Some(cols[0])).is_err() {
            continue;
        }
        key.set_metric(nonzero(cols[6]));
        key.set_mss(nonzero(cols[8]));
        key.set_window(nonzero(cols[9]));
        key.set_irtt(nonzero(cols[10]));
        key.set_reject(flags & RTF_REJECT != 0);
        let mut route_flags = RouteFlags::empty();
        for (flag, bit) in KERNEL_ROUTE_FLAGS {
            if flags & bit != 0 {
                route_flags.insert(flag);
            }
        }
        key.set_flags(route_flags);
        routes.push(key);
    }

    routes
}

/// Neighbor entries from /proc/net/arp.
fn parse_proc_arp(text: &str) -> Vec<NeighborEntry> {
    let mut entries = Vec::new();

    for line in text.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 6 {
            continue;
        }
        let Ok(address) = cols[0].parse() else {
            continue;
        };
        let flags = i32::from_str_radix(cols[2].trim_start_matches("0x"), 16).unwrap_or(0);
        let complete = flags & ATF_COM != 0;
        entries.push(NeighborEntry {
            address,
            lladdr: parse_mac(cols[3]).ok().filter(|_| complete),
            ifname: cols[5].to_owned(),
            permanent: flags & ATF_PERM != 0,
            complete,
        });
    }

    entries
}

/// Backend built on ioctl sockets and procfs.
pub struct IoctlBackend {
    sock: IoctlSocket,
    paths: HostPaths,
}

impl IoctlBackend {
    /// Open the ioctl socket.
    pub fn new(paths: HostPaths) -> Result<Self> {
        Ok(Self {
            sock: IoctlSocket::new()?,
            paths,
        })
    }

    async fn read_proc(path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::from(e).with_context(format!("read {}", path.display())))
    }

    async fn vconfig(&self, args: &[&str]) -> Result<()> {
        let command = format!("{} {}", self.paths.vconfig.display(), args.join(" "));
        debug!("running {}", command);
        let status = Command::new(&self.paths.vconfig)
            .args(args)
            .status()
            .await
            .map_err(|e| Error::from(e).with_context(&command))?;
        if !status.success() {
            return Err(Error::ShellCommandFailed { command });
        }
        Ok(())
    }

    /// Remove `addr` from the interface or alias it is labelled under.
    /// Aliases are taken down, which drops their address.
    fn remove_labelled(&self, label: &str, addr: Ipv4Addr) -> Result<()> {
        let result = if label.contains(':') {
            self.sock.update_flags(label, 0, iff::UP)
        } else {
            self.sock
                .set_addr(SIOCSIFADDR, label, Ipv4Addr::UNSPECIFIED, "SIOCSIFADDR")
        };
        address_gone_ok(addr, result)
    }

    fn find_on(&self, ifname: &str, addr: Ipv4Addr) -> Result<Option<NetAddress>> {
        Ok(inet_addresses()?
            .into_iter()
            .find(|a| a.address == addr && a.is_on(ifname)))
    }

    fn route_ioctl(&self, request: libc::c_ulong, key: &RouteKey, what: &str) -> Result<()> {
        let dev = key
            .dev()
            .map(CString::new)
            .transpose()
            .map_err(|_| Error::InvalidValue(format!("bad device in route {}", key)))?;
        // `dev` outlives the ioctl that reads rt_dev.
        let mut rt = route_entry(key, dev.as_ref())?;
        self.sock
            .ioctl(request, &mut rt, &format!("{} {}", what, key))
    }

    fn arp_request(&self, addr: Ipv4Addr, dev: &str) -> Result<ArpReq> {
        let mut req: ArpReq = unsafe { mem::zeroed() };
        req.arp_pa = sockaddr_in(addr);
        copy_name(&mut req.arp_dev, dev)?;
        Ok(req)
    }
}

impl Backend for IoctlBackend {
    fn name(&self) -> &'static str {
        "ioctl"
    }

    async fn interfaces(&mut self) -> Result<Vec<LinkInfo>> {
        let mut names = parse_proc_dev(&Self::read_proc(&self.paths.proc_net_dev).await?);
        for addr in inet_addresses()? {
            if !names.contains(&addr.ifname) {
                names.push(addr.ifname);
            }
        }

        let mut links = Vec::with_capacity(names.len());
        for name in names {
            match self.sock.link_info(&name) {
                Ok(link) => links.push(link),
                Err(e) => debug!("skipping {}: {}", name, e),
            }
        }
        Ok(links)
    }

    async fn vlan_add(&mut self, base: &str, vid: u16) -> Result<()> {
        self.vconfig(&["add", base, &vid.to_string()]).await
    }

    async fn vlan_delete(&mut self, name: &str) -> Result<()> {
        self.vconfig(&["rem", name]).await
    }

    async fn set_link_up(&mut self, name: &str, up: bool) -> Result<()> {
        let name = base_ifname(name);
        if up {
            self.sock.update_flags(name, iff::UP, 0)
        } else {
            self.sock.update_flags(name, 0, iff::UP)
        }
    }

    async fn set_link_arp(&mut self, name: &str, enabled: bool) -> Result<()> {
        let name = base_ifname(name);
        if enabled {
            self.sock.update_flags(name, 0, iff::NOARP)
        } else {
            self.sock.update_flags(name, iff::NOARP, 0)
        }
    }

    async fn set_link_mtu(&mut self, name: &str, mtu: u32) -> Result<()> {
        let name = base_ifname(name);
        let mut ifr = ifreq(name)?;
        ifr.ifr_ifru.ifru_mtu = mtu as libc::c_int;
        self.sock
            .ioctl(SIOCSIFMTU, &mut ifr, &format!("SIOCSIFMTU {}", name))
    }

    async fn addresses(&mut self) -> Result<Vec<NetAddress>> {
        inet_addresses()
    }

    async fn address_add(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        prefix: u8,
        broadcast: Option<Ipv4Addr>,
    ) -> Result<()> {
        let current = inet_addresses()?;
        let target = if current.iter().any(|a| a.ifname == ifname) {
            let base = base_ifname(ifname);
            let mut names: Vec<String> = self.interfaces().await?.into_iter().map(|l| l.name).collect();
            names.extend(current.into_iter().map(|a| a.ifname));
            let slot = allocate_slot(names.iter().map(String::as_str), base)?;
            alias_name(base, slot)
        } else {
            ifname.to_owned()
        };

        self.sock.set_addr(SIOCSIFADDR, &target, addr, "SIOCSIFADDR")?;

        let mask = Ipv4Addr::from(prefix_mask(prefix));
        let mut result = self
            .sock
            .set_addr(SIOCSIFNETMASK, &target, mask, "SIOCSIFNETMASK");
        if result.is_ok()
            && let Some(brd) = broadcast
        {
            result = self
                .sock
                .set_addr(SIOCSIFBRDADDR, &target, brd, "SIOCSIFBRDADDR");
        }
        if result.is_ok() && target != ifname {
            result = self.sock.update_flags(&target, iff::UP, 0);
        }
        if let Err(e) = result {
            warn!("rolling back {} on {}: {}", addr, target, e);
            if let Err(undo) = self.remove_labelled(&target, addr) {
                error!("rollback of {} on {} failed: {}", addr, target, undo);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn address_delete(&mut self, ifname: &str, addr: Ipv4Addr) -> Result<()> {
        match self.find_on(ifname, addr)? {
            Some(current) => self.remove_labelled(&current.ifname, addr),
            None => {
                warn!("address {} is not on {}", addr, ifname);
                Ok(())
            }
        }
    }

    async fn address_set_prefix(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        prefix: u8,
    ) -> Result<()> {
        let current = self
            .find_on(ifname, addr)?
            .ok_or_else(|| Error::not_found(format!("address {} on {}", addr, ifname)))?;
        let mask = Ipv4Addr::from(prefix_mask(prefix));
        self.sock
            .set_addr(SIOCSIFNETMASK, &current.ifname, mask, "SIOCSIFNETMASK")?;
        self.sock.set_addr(
            SIOCSIFBRDADDR,
            &current.ifname,
            broadcast_for(addr, prefix),
            "SIOCSIFBRDADDR",
        )
    }

    async fn address_set_broadcast(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        broadcast: Ipv4Addr,
    ) -> Result<()> {
        let current = self
            .find_on(ifname, addr)?
            .ok_or_else(|| Error::not_found(format!("address {} on {}", addr, ifname)))?;
        self.sock
            .set_addr(SIOCSIFBRDADDR, &current.ifname, broadcast, "SIOCSIFBRDADDR")
    }

    async fn routes(&mut self) -> Result<Vec<RouteKey>> {
        Ok(parse_proc_route(
            &Self::read_proc(&self.paths.proc_net_route).await?,
        ))
    }

    async fn route_replace_or_delete(&mut self, change: &RouteChange) -> Result<()> {
        match change {
            RouteChange::Create(key) => self.route_ioctl(SIOCADDRT, key, "SIOCADDRT"),
            RouteChange::Replace { current, desired } => {
                self.route_ioctl(SIOCDELRT, current, "SIOCDELRT")?;
                if let Err(e) = self.route_ioctl(SIOCADDRT, desired, "SIOCADDRT") {
                    error!("re-adding route {} failed: {}", desired, e);
                    if let Err(restore) = self.route_ioctl(SIOCADDRT, current, "SIOCADDRT") {
                        error!("restoring route {} failed: {}", current, restore);
                    }
                    return Err(e);
                }
                Ok(())
            }
            RouteChange::Delete(key) => self.route_ioctl(SIOCDELRT, key, "SIOCDELRT"),
        }
    }

    async fn neighbors(&mut self) -> Result<Vec<NeighborEntry>> {
        Ok(parse_proc_arp(
            &Self::read_proc(&self.paths.proc_net_arp).await?,
        ))
    }

    async fn neighbor_set(&mut self, addr: Ipv4Addr, mac: [u8; 6], permanent: bool) -> Result<()> {
        let existing = self
            .neighbors()
            .await?
            .into_iter()
            .find(|n| n.address == addr)
            .map(|n| n.ifname);
        let dev = match existing {
            Some(dev) => dev,
            None => inet_addresses()?
                .into_iter()
                .find(|a| ipv4_in_prefix(addr, a.address, a.prefix))
                .map(|a| a.link)
                .ok_or_else(|| {
                    Error::from_errno(libc::ENETUNREACH)
                        .with_context(format!("no interface reaches {}", addr))
                })?,
        };

        let mut req = self.arp_request(addr, &dev)?;
        req.arp_ha.sa_family = ARPHRD_ETHER;
        for (d, s) in req.arp_ha.sa_data.iter_mut().zip(mac) {
            *d = s as libc::c_char;
        }
        req.arp_flags = ATF_COM | if permanent { ATF_PERM } else { 0 };
        self.sock.ioctl(
            SIOCSARP,
            &mut req,
            &format!("SIOCSARP {} {}", addr, format_mac(&mac)),
        )
    }

    async fn neighbor_delete(&mut self, addr: Ipv4Addr) -> Result<()> {
        let devs: Vec<String> = self
            .neighbors()
            .await?
            .into_iter()
            .filter(|n| n.address == addr)
            .map(|n| n.ifname)
            .collect();

        if devs.is_empty() {
            warn!("neighbor {} not present", addr);
            return Ok(());
        }

        for dev in devs {
            let mut req = self.arp_request(addr, &dev)?;
            let result = self
                .sock
                .ioctl(SIOCDARP, &mut req, &format!("SIOCDARP {}", addr));
            neighbor_gone_ok(addr, result)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_ROUTE: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth0\t00000000\t0100000A\t0003\t0\t0\t100\t00000000\t0\t0\t0
eth0\t0000000A\t00000000\t0001\t0\t0\t0\t00FFFFFF\t1400\t0\t0
*\t0000A8C0\t00000000\t0201\t0\t0\t0\t00FFFFFF\t0\t0\t0
eth0\t0000010A\t00000000\t0031\t0\t0\t0\t00FFFFFF\t0\t0\t0
";

    #[test]
    fn test_parse_proc_route() {
        let routes = parse_proc_route(PROC_ROUTE);
        assert_eq!(routes.len(), 4);
        assert_eq!(
            routes[0].to_string(),
            "0.0.0.0|0,gw=10.0.0.1,dev=eth0,metric=100"
        );
        assert_eq!(routes[1].to_string(), "10.0.0.0|24,dev=eth0,mss=1400");
        assert_eq!(routes[2].to_string(), "192.168.0.0|24,reject");
        assert!(routes[2].flags().is_empty());
        assert_eq!(routes[3].to_string(), "10.1.0.0|24,dev=eth0");
        assert_eq!(routes[3].flags().to_string(), "mod dyn");
    }

    #[test]
    fn test_parse_proc_arp() {
        let text = "\
IP address       HW type     Flags       HW address            Mask     Device
10.0.0.1         0x1         0x2         52:54:00:12:35:02     *        eth0
10.0.0.7         0x1         0x6         02:00:00:00:00:07     *        eth0
10.0.0.9         0x1         0x0         00:00:00:00:00:00     *        eth0
";
        let entries = parse_proc_arp(text);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].complete && !entries[0].permanent);
        assert_eq!(entries[0].lladdr, Some([0x52, 0x54, 0, 0x12, 0x35, 0x02]));
        assert!(entries[1].permanent);
        assert!(!entries[2].complete);
        assert_eq!(entries[2].lladdr, None);
    }

    #[test]
    fn test_parse_proc_dev() {
        let text = "\
Inter-|   Receive                            |  Transmit
 face |bytes    packets errs drop fifo frame|bytes
    lo:  123 4 0 0 0 0|123
  eth0: 99 1 0 0 0 0|99
";
        assert_eq!(parse_proc_dev(text), vec!["lo", "eth0"]);
    }

    #[test]
    fn test_route_entry_flags() {
        let backend_key = "10.1.0.0|16,gw=10.0.0.1,metric=5,mss=1400"
            .parse::<RouteKey>()
            .unwrap();
        let rt = route_entry(&backend_key, None).unwrap();
        assert_eq!(rt.rt_flags, RTF_UP | RTF_STATIC | RTF_GATEWAY | RTF_MTU);
        assert_eq!(rt.rt_metric, 6);
        assert_eq!(rt.rt_mtu, 1400);
        assert!(rt.rt_dev.is_null());

        let host = "10.1.0.1|32,dev=eth0,metric=0".parse::<RouteKey>().unwrap();
        let rt = route_entry(&host, None).unwrap();
        assert_eq!(rt.rt_flags, RTF_UP | RTF_STATIC | RTF_HOST);
        assert_eq!(rt.rt_metric, 0);

        let mut flagged = "10.1.0.0|16,dev=eth0".parse::<RouteKey>().unwrap();
        flagged.set_flags(RouteFlags::parse("reinstate dyn").unwrap());
        let rt = route_entry(&flagged, None).unwrap();
        assert_eq!(rt.rt_flags, RTF_UP | RTF_STATIC | RTF_DYNAMIC | RTF_REINSTATE);
    }

    #[test]
    fn test_route_entry_range() {
        let key = |name: &str| name.parse::<RouteKey>().unwrap();

        let rt = route_entry(&key("10.1.0.0|16,metric=32766,irtt=65535"), None).unwrap();
        assert_eq!(rt.rt_metric, i16::MAX);
        assert_eq!(rt.rt_irtt, u16::MAX);

        for name in ["10.1.0.0|16,metric=32767", "10.1.0.0|16,irtt=65536"] {
            let err = route_entry(&key(name), None).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::InvalidValue, "{}", name);
        }
    }
}
