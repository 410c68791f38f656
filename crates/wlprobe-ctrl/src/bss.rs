use serde::Serialize;
use wlprobe_wext::ie::{decode_elements, WpaInfo};

use crate::error::{CtrlError, Result};

/// BSS details from a `BSS <n>` reply
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BssInfo {
    pub bssid: Option<String>,
    pub freq: Option<u32>,
    pub level: Option<i32>,
    pub flags: Option<String>,
    pub ssid: Option<String>,
    #[serde(skip)]
    pub ie: Option<Vec<u8>>,
    #[serde(skip)]
    pub beacon_ie: Option<Vec<u8>>,
}

impl BssInfo {
    pub fn parse(reply: &str) -> Self {
        let mut info = BssInfo::default();

        for line in reply.lines() {
            if let Some((key, value)) = line.split_once('=') {
                match key {
                    "bssid" => info.bssid = Some(value.to_string()),
                    "freq" => info.freq = value.parse().ok(),
                    "level" => info.level = value.parse().ok(),
                    "flags" => info.flags = Some(value.to_string()),
                    "ssid" => info.ssid = Some(value.to_string()),
                    "ie" => info.ie = parse_hex_bytes(value).ok().filter(|b| !b.is_empty()),
                    "beacon_ie" => {
                        info.beacon_ie = parse_hex_bytes(value).ok().filter(|b| !b.is_empty())
                    }
                    _ => {}
                }
            }
        }

        info
    }

    /// WPA and RSN elements advertised by the BSS, in element order.
    ///
    /// Uses the probe-response IEs, falling back to the beacon IEs.
    pub fn security(&self) -> Vec<WpaInfo> {
        self.ie
            .as_deref()
            .or(self.beacon_ie.as_deref())
            .map(|ies| {
                decode_elements(ies)
                    .into_iter()
                    .filter(|info| !info.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Decode a hex string, ignoring separators.
pub fn parse_hex_bytes(input: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut hi: Option<u8> = None;

    for ch in input.chars() {
        if let Some(val) = ch.to_digit(16) {
            let val = val as u8;
            if let Some(high) = hi.take() {
                bytes.push((high << 4) | val);
            } else {
                hi = Some(val);
            }
        }
    }

    if hi.is_some() {
        return Err(CtrlError::Protocol {
            command: "BSS".to_string(),
            response: "odd-length hex string in IE".to_string(),
        });
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wlprobe_wext::ie::{Cipher, IeType, KeyMgmt};

    const REPLY: &str = "id=3\nbssid=00:11:22:33:44:55\nfreq=5180\nbeacon_int=100\n\
capabilities=0x0411\nqual=0\nnoise=-92\nlevel=-48\ntsf=0000012345678901\nage=2\n\
ie=0004686f6d6530140100000fac040100000fac040100000fac020c00\n\
flags=[WPA2-PSK-CCMP][ESS]\nssid=home\n";

    #[test]
    fn parses_bss_reply() {
        let info = BssInfo::parse(REPLY);
        assert_eq!(info.bssid.as_deref(), Some("00:11:22:33:44:55"));
        assert_eq!(info.freq, Some(5180));
        assert_eq!(info.level, Some(-48));
        assert_eq!(info.flags.as_deref(), Some("[WPA2-PSK-CCMP][ESS]"));
        assert_eq!(info.ssid.as_deref(), Some("home"));
        assert_eq!(info.ie.as_ref().map(Vec::len), Some(28));
        assert!(info.beacon_ie.is_none());
    }

    #[test]
    fn security_decodes_rsn() {
        let security = BssInfo::parse(REPLY).security();
        assert_eq!(security.len(), 1);
        assert_eq!(security[0].ie_type, Some(IeType::Rsn));
        assert_eq!(security[0].group, Some(Cipher::Ccmp));
        assert_eq!(security[0].pairwise, vec![Some(Cipher::Ccmp)]);
        assert_eq!(security[0].auth, vec![Some(KeyMgmt::Psk)]);
    }

    #[test]
    fn no_ie_means_no_security() {
        let info = BssInfo::parse("bssid=00:11:22:33:44:55\nssid=open\n");
        assert!(info.security().is_empty());
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_bytes("dd0a").unwrap(), vec![0xdd, 0x0a]);
        assert_eq!(parse_hex_bytes("DD:0A").unwrap(), vec![0xdd, 0x0a]);
        assert!(parse_hex_bytes("").unwrap().is_empty());
        assert!(parse_hex_bytes("abc").is_err());
    }
}
