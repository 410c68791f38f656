//! Text rendering for CLI results.

use std::fmt::Write;

use serde::Serialize;
use wlprobe_ctrl::{BssInfo, WpaStatus};
use wlprobe_wext::{AccessPointRecord, NetworkSummary, WpaInfo};

const INDENT: &str = "                    ";

/// iwlist-style listing of scanned cells.
pub fn format_cells(interface: &str, records: &[AccessPointRecord]) -> String {
    if records.is_empty() {
        return format!("{:<8}  No scan results\n", interface);
    }

    let mut out = format!("{:<8}  Scan completed :\n", interface);
    for (idx, cell) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "          Cell {:02} - Address: {}",
            idx + 1,
            cell.bssid.as_deref().unwrap_or("??")
        );
        if let Some(essid) = &cell.essid {
            let _ = writeln!(out, "{}ESSID:\"{}\"", INDENT, essid);
        }
        if let Some(protocol) = &cell.protocol {
            let _ = writeln!(out, "{}Protocol:{}", INDENT, protocol);
        }
        if let Some(mode) = &cell.mode {
            let _ = writeln!(out, "{}Mode:{}", INDENT, mode);
        }
        if let Some(freq) = &cell.frequency {
            match cell.channel {
                Some(channel) => {
                    let _ = writeln!(out, "{}Frequency:{} (Channel {})", INDENT, freq, channel);
                }
                None => {
                    let _ = writeln!(out, "{}Frequency:{}", INDENT, freq);
                }
            }
        }
        if let Some(enc) = cell.enc {
            let _ = writeln!(
                out,
                "{}Encryption key:{}",
                INDENT,
                if enc { "on" } else { "off" }
            );
        }
        if let Some(rate) = &cell.bitrate {
            let _ = writeln!(out, "{}Bit Rates:{}", INDENT, rate);
        }
        if let Some(stats) = &cell.stats {
            let _ = writeln!(out, "{}{}", INDENT, stats.trim_end());
        }
        if let Some(ie) = &cell.ie {
            out.push_str(&format_ie(ie));
        }
    }
    out
}

fn suite_list<T: ToString>(suites: &[Option<T>]) -> String {
    suites
        .iter()
        .map(|s| s.as_ref().map(T::to_string).unwrap_or_else(|| "unknown".to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// IE block as printed under a cell.
pub fn format_ie(ie: &WpaInfo) -> String {
    let mut out = String::new();
    let Some(ie_type) = ie.ie_type else {
        let _ = writeln!(out, "{}IE: Unknown", INDENT);
        return out;
    };
    let _ = writeln!(
        out,
        "{}IE: {} Version {}",
        INDENT,
        ie_type,
        ie.version.unwrap_or_default()
    );
    let group = ie
        .group
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let _ = writeln!(out, "{}    Group Cipher : {}", INDENT, group);
    let _ = writeln!(
        out,
        "{}    Pairwise Ciphers ({}) : {}",
        INDENT,
        ie.pairwise.len(),
        suite_list(&ie.pairwise)
    );
    if !ie.auth.is_empty() {
        let _ = writeln!(
            out,
            "{}    Authentication Suites ({}) : {}",
            INDENT,
            ie.auth.len(),
            suite_list(&ie.auth)
        );
    }
    out
}

/// One line per network, in the same column order as `wpa_cli scan_results`.
pub fn format_summaries(summaries: &[NetworkSummary]) -> String {
    let mut out = String::from("bssid / channel / quality / signal / encryption / essid\n");
    for s in summaries {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            s.bssid.as_deref().unwrap_or("-"),
            s.channel.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
            s.quality.map(|q| q.to_string()).unwrap_or_else(|| "-".into()),
            s.strength.map(|q| q.to_string()).unwrap_or_else(|| "-".into()),
            s.encryption_method.map(|m| m.as_str()).unwrap_or(if s.encryption {
                "on"
            } else {
                "off"
            }),
            s.essid
        );
    }
    out
}

/// `wpa_cli scan_results` style table.
pub fn format_bss_list(entries: &[BssInfo]) -> String {
    let mut out = String::from("bssid / frequency / signal level / flags / ssid\n");
    for bss in entries {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            bss.bssid.as_deref().unwrap_or(""),
            bss.freq.map(|f| f.to_string()).unwrap_or_default(),
            bss.level.map(|l| l.to_string()).unwrap_or_default(),
            bss.flags.as_deref().unwrap_or(""),
            bss.ssid.as_deref().unwrap_or("")
        );
    }
    out
}

#[derive(Serialize)]
pub struct BssView<'a> {
    #[serde(flatten)]
    pub info: &'a BssInfo,
    pub security: Vec<WpaInfo>,
}

pub fn bss_views(entries: &[BssInfo]) -> Vec<BssView<'_>> {
    entries
        .iter()
        .map(|info| BssView {
            info,
            security: info.security(),
        })
        .collect()
}

pub fn format_status(status: &WpaStatus) -> String {
    let mut out = String::new();
    let fields = [
        ("wpa_state", Some(status.wpa_state.to_string())),
        ("ssid", status.ssid.clone()),
        ("bssid", status.bssid.clone()),
        ("freq", status.freq.map(|f| f.to_string())),
        ("mode", status.mode.clone()),
        ("key_mgmt", status.key_mgmt.clone()),
        ("pairwise_cipher", status.pairwise_cipher.clone()),
        ("group_cipher", status.group_cipher.clone()),
        ("ip_address", status.ip_address.clone()),
        ("address", status.address.clone()),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{}={}", key, value);
        }
    }
    out
}
