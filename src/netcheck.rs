/*
 *  netcheck.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::time::Duration;

use log::{debug, warn};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::{PROBE_HOST, PROBE_PORT, PROBE_TIMEOUT_SECS};

/// Answers whether the outside world is reachable.
#[allow(async_fn_in_trait)]
pub trait NetworkProbe {
    async fn is_reachable(&self) -> bool;
}

/// TCP connect to a well known host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    wait: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(PROBE_HOST, PROBE_PORT, Duration::from_secs(PROBE_TIMEOUT_SECS))
    }
}

impl TcpProbe {
    pub fn new(host: &str, port: u16, wait: Duration) -> Self {
        Self { host: host.to_string(), port, wait }
    }
}

impl NetworkProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match timeout(self.wait, TcpStream::connect((self.host.as_str(), self.port))).await {
            Ok(Ok(_)) => {
                debug!("{}:{} reachable", self.host, self.port);
                true
            }
            Ok(Err(e)) => {
                warn!("{}:{} unreachable: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                warn!("{}:{} timed out after {:?}", self.host, self.port, self.wait);
                false
            }
        }
    }
}
