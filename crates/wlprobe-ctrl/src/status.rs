use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Serialize, Serializer};

use crate::ctrl::ControlConnection;
use crate::error::Result;

/// Parsed `STATUS` reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WpaStatus {
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub freq: Option<u32>,
    pub mode: Option<String>,
    pub pairwise_cipher: Option<String>,
    pub group_cipher: Option<String>,
    pub key_mgmt: Option<String>,
    pub wpa_state: WpaState,
    pub ip_address: Option<String>,
    pub address: Option<String>,
}

/// `wpa_state` values reported by `STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WpaState {
    Disconnected,
    Scanning,
    Authenticating,
    Associating,
    Associated,
    FourWayHandshake,
    GroupHandshake,
    Completed,
    Unknown,
}

impl WpaState {
    const NAMED: [(WpaState, &'static str); 8] = [
        (WpaState::Disconnected, "DISCONNECTED"),
        (WpaState::Scanning, "SCANNING"),
        (WpaState::Authenticating, "AUTHENTICATING"),
        (WpaState::Associating, "ASSOCIATING"),
        (WpaState::Associated, "ASSOCIATED"),
        (WpaState::FourWayHandshake, "4WAY_HANDSHAKE"),
        (WpaState::GroupHandshake, "GROUP_HANDSHAKE"),
        (WpaState::Completed, "COMPLETED"),
    ];

    pub fn as_str(self) -> &'static str {
        Self::NAMED
            .iter()
            .find(|(state, _)| *state == self)
            .map_or("UNKNOWN", |(_, name)| name)
    }

    /// Case-insensitive. `INACTIVE` counts as disconnected; anything
    /// unrecognised is `Unknown`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("INACTIVE") {
            return WpaState::Disconnected;
        }
        Self::NAMED
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(value))
            .map_or(WpaState::Unknown, |(state, _)| *state)
    }
}

impl fmt::Display for WpaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WpaState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl WpaStatus {
    /// Parse `key=value` lines. A reply without `wpa_state` reads as
    /// disconnected.
    pub fn parse(reply: &str) -> Self {
        let mut status = WpaStatus {
            ssid: None,
            bssid: None,
            freq: None,
            mode: None,
            pairwise_cipher: None,
            group_cipher: None,
            key_mgmt: None,
            wpa_state: WpaState::Disconnected,
            ip_address: None,
            address: None,
        };

        for line in reply.lines() {
            if let Some((key, value)) = line.split_once('=') {
                match key {
                    "ssid" => status.ssid = Some(value.to_string()),
                    "bssid" => status.bssid = Some(value.to_string()),
                    "freq" => status.freq = value.parse().ok(),
                    "mode" => status.mode = Some(value.to_string()),
                    "pairwise_cipher" => status.pairwise_cipher = Some(value.to_string()),
                    "group_cipher" => status.group_cipher = Some(value.to_string()),
                    "key_mgmt" => status.key_mgmt = Some(value.to_string()),
                    "wpa_state" => status.wpa_state = WpaState::parse(value),
                    "ip_address" => status.ip_address = Some(value.to_string()),
                    "address" => status.address = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        status
    }
}

/// Limits for [`wait_for_authentication`].
#[derive(Debug, Clone)]
pub struct AuthWaitConfig {
    /// Give up this long after authentication started.
    pub max_time: Duration,
    /// Time spent disconnected before a rescan is forced.
    pub max_disconnected_time: Duration,
    /// Added to `max_time` for every forced rescan.
    pub rescan_extension: Duration,
    /// Forced rescans allowed before waiting out the deadline.
    pub max_rescans: u32,
    pub poll_interval: Duration,
}

impl Default for AuthWaitConfig {
    fn default() -> Self {
        Self {
            max_time: Duration::from_secs(15),
            max_disconnected_time: Duration::from_secs(3),
            rescan_extension: Duration::from_secs(5),
            max_rescans: 3,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Poll `STATUS` until the supplicant reports `COMPLETED`.
///
/// Returns `Ok(false)` when the deadline passes or a reply carries no
/// `wpa_state` line. A supplicant stuck in `DISCONNECTED` is kicked with
/// `SCAN` up to `max_rescans` times, each kick extending the deadline.
/// A `false` result can mean the handshake simply has not finished yet.
pub fn wait_for_authentication(
    conn: &ControlConnection,
    started: Instant,
    config: &AuthWaitConfig,
) -> Result<bool> {
    let mut max_time = config.max_time;
    let mut rescans = 0;

    while started.elapsed() < max_time {
        let reply = conn.request("STATUS")?;
        let Some(state) = reply
            .lines()
            .find_map(|line| line.strip_prefix("wpa_state="))
        else {
            debug!("[CTRL] STATUS reply without wpa_state");
            return Ok(false);
        };

        match WpaState::parse(state) {
            WpaState::Completed => {
                info!("[CTRL] authenticated after {:?}", started.elapsed());
                return Ok(true);
            }
            WpaState::Disconnected
                if state.trim().eq_ignore_ascii_case("DISCONNECTED")
                    && started.elapsed() > config.max_disconnected_time
                    && rescans < config.max_rescans =>
            {
                debug!("[CTRL] still disconnected, forcing a rescan");
                conn.request("SCAN")?;
                max_time += config.rescan_extension;
                rescans += 1;
            }
            other => debug!("[CTRL] wpa_state {} after {:?}", other, started.elapsed()),
        }
        thread::sleep(config.poll_interval);
    }

    warn!("[CTRL] authentication may have failed");
    Ok(false)
}
