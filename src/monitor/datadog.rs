//! DogStatsD backend: counters and timings as UDP datagrams in the
//! dogstatsd line format `name:value|type|#tags`.

use std::net::UdpSocket;

use crate::status::StatusCounts;

use super::{Error, Monitor, Result};

const STATUS_PREFIX: &str = "docker-log-monitor.status.";
const TIMING_PREFIX: &str = "docker-log-monitor.timing.";

/// Sends metrics to a DogStatsD agent over UDP.
pub struct DogStatsD {
    socket: UdpSocket,
}

impl DogStatsD {
    /// Binds a local socket and connects it to the agent address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Socket`] if binding or connecting fails.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(Error::Socket)?;
        socket.connect((host, port)).map_err(Error::Socket)?;
        Ok(Self { socket })
    }
}

impl Monitor for DogStatsD {
    fn inc_statuses(&self, container: &str, statuses: &StatusCounts) -> Result<()> {
        for (status, count) in statuses.iter() {
            if count == 0 {
                continue;
            }
            let signal = format!("{STATUS_PREFIX}{status}");
            let datagram = format!("{signal}:1|c|#container:{container}");
            for _ in 0..count {
                self.socket.send(datagram.as_bytes()).map_err(Error::Send)?;
            }
            log::debug!("Increment signal `{signal}` at {count} with tags container:{container}");
        }
        Ok(())
    }

    fn send_timing(&self, container: &str, timing: &str, value: f64) -> Result<()> {
        let signal = format!("{TIMING_PREFIX}{timing}");
        let datagram = format!("{signal}:{value}|ms|#container:{container}");
        self.socket.send(datagram.as_bytes()).map_err(Error::Send)?;
        log::debug!("Send timing with signal `{signal}`, value {value} and tags container:{container}");
        Ok(())
    }
}
