//! Wireless interface discovery from `/proc/net/wireless`.

use std::fs;

use log::debug;

use crate::error::{Result, WextError};
use crate::ioctl::WextDevice;

pub const PROC_NET_WIRELESS: &str = "/proc/net/wireless";

/// Interface names listed in a `/proc/net/wireless` table.
///
/// The first two lines are headers; each following line starts with the
/// interface name terminated by `:`.
pub fn parse_proc_net_wireless(contents: &str) -> Vec<String> {
    contents
        .lines()
        .skip(2)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, _)| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Names from `contents` accepted by `probe`, in table order.
pub fn enumerate_with<F>(contents: &str, mut probe: F) -> Vec<String>
where
    F: FnMut(&str) -> bool,
{
    parse_proc_net_wireless(contents)
        .into_iter()
        .filter(|name| {
            let ok = probe(name);
            if !ok {
                debug!("[SCAN] {} listed but has no wireless extensions", name);
            }
            ok
        })
        .collect()
}

/// Wireless interfaces on this host that answer `SIOCGIWNAME`.
pub fn enumerate_devices() -> Result<Vec<String>> {
    let contents = fs::read_to_string(PROC_NET_WIRELESS)
        .map_err(|e| WextError::io_error(format!("reading {}", PROC_NET_WIRELESS), e))?;
    Ok(enumerate_with(&contents, WextDevice::probe))
}
