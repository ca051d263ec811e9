//! Receives text tracking packets over UDP, unicast or multicast.

use crate::error::TrackingError;
use crate::pose::Pose;
use crate::pose_decoder::decode;
use crate::tracking_source::{PacketFilter, TrackingSource};
use log::info;
use std::{
    io,
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    str,
    time::Duration,
};

/// Largest datagram we expect; matches NatNet's maximum packet size.
const MAX_PACKETSIZE: usize = 100_000;

/// A [`TrackingSource`] listening on a UDP port. Each datagram holds one or
/// more packet lines; see [`crate::pose_decoder`].
pub struct UdpSource {
    socket: UdpSocket,
    filter: PacketFilter,
    buf: Vec<u8>,
}

impl UdpSource {
    /// Binds to `port` on all interfaces and, if `multicast` is given, joins
    /// that group on `interface` (any interface if `None`).
    ///
    /// Every receive gives up after `timeout` and reports
    /// [`TrackingError::Unavailable`], which bounds how long a bridge takes
    /// to notice a stop request.
    pub fn bind(
        port: u16,
        multicast: Option<Ipv4Addr>,
        interface: Option<Ipv4Addr>,
        timeout: Duration,
    ) -> Result<Self, TrackingError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).map_err(TrackingError::Io)?;
        if let Some(group) = multicast {
            let iface = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
            socket
                .join_multicast_v4(&group, &iface)
                .map_err(TrackingError::Io)?;
            info!("Joined multicast group {} on {}", group, iface);
        }
        // A zero timeout is rejected by the OS; treat it as "as short as possible".
        let timeout = timeout.max(Duration::from_millis(1));
        socket
            .set_read_timeout(Some(timeout))
            .map_err(TrackingError::Io)?;
        info!("Listening for tracking data on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            filter: PacketFilter::new(),
            buf: vec![0; MAX_PACKETSIZE],
        })
    }

    /// The address the socket ended up bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl TrackingSource for UdpSource {
    fn get_rigid_body(&mut self, rb_id: usize) -> Result<Pose, TrackingError> {
        loop {
            let len = self.socket.recv(&mut self.buf)?;
            let text = str::from_utf8(&self.buf[..len])
                .map_err(|e| TrackingError::Malformed(e.to_string()))?;

            // Only the newest frame of a datagram matters.
            let mut newest = None;
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                if let Some(pose) = self.filter.handle(decode(line)?, rb_id)? {
                    newest = Some(pose);
                }
            }
            if let Some(pose) = newest {
                return Ok(pose);
            }
        }
    }
}
