//! WPA / RSN information element decoding.
//!
//! Elements come straight from beacons and probe responses, so every read is
//! bounds checked and a short element yields a partial [`WpaInfo`] instead of
//! an error.

use std::fmt;

use serde::{Serialize, Serializer};

pub const EID_RSN: u8 = 0x30;
pub const EID_VENDOR: u8 = 0xdd;

const WPA_OUI: [u8; 3] = [0x00, 0x50, 0xf2];
const RSN_OUI: [u8; 3] = [0x00, 0x0f, 0xac];
const WPA_OUI_TYPE: u8 = 0x01;

/// Kind of security element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IeType {
    Wpa,
    Rsn,
}

impl IeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IeType::Wpa => "WPA",
            IeType::Rsn => "IEEE 802.11i/WPA2",
        }
    }
}

/// Cipher suite selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    None,
    Wep40,
    Tkip,
    Wrap,
    Ccmp,
    Wep104,
    /// Suite from another vendor's OUI.
    Proprietary,
}

impl Cipher {
    fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Cipher::None),
            1 => Some(Cipher::Wep40),
            2 => Some(Cipher::Tkip),
            3 => Some(Cipher::Wrap),
            4 => Some(Cipher::Ccmp),
            5 => Some(Cipher::Wep104),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cipher::None => "none",
            Cipher::Wep40 => "WEP-40",
            Cipher::Tkip => "TKIP",
            Cipher::Wrap => "WRAP",
            Cipher::Ccmp => "CCMP",
            Cipher::Wep104 => "WEP-104",
            Cipher::Proprietary => "Proprietary",
        }
    }
}

/// Authentication / key management suite selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMgmt {
    None,
    Ieee8021x,
    Psk,
    Proprietary,
}

impl KeyMgmt {
    fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(KeyMgmt::None),
            1 => Some(KeyMgmt::Ieee8021x),
            2 => Some(KeyMgmt::Psk),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMgmt::None => "none",
            KeyMgmt::Ieee8021x => "802.1x",
            KeyMgmt::Psk => "PSK",
            KeyMgmt::Proprietary => "Proprietary",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    )*};
}

display_as_str!(IeType, Cipher, KeyMgmt);

/// Decoded WPA or RSN element.
///
/// Selectors outside the known tables decode to `None`, also inside the
/// suite lists, so list positions match the element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WpaInfo {
    #[serde(rename = "type")]
    pub ie_type: Option<IeType>,
    pub version: Option<u16>,
    pub group: Option<Cipher>,
    pub pairwise: Vec<Option<Cipher>>,
    pub auth: Vec<Option<KeyMgmt>>,
}

impl WpaInfo {
    /// Whether any part of the element was recognised.
    pub fn is_empty(&self) -> bool {
        self.ie_type.is_none()
    }
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn suite_matches(suite: &[u8], oui: &[u8; 3]) -> bool {
    suite[0..3] == oui[..]
}

/// Decode the element at the start of `buf`.
///
/// `buf` may extend past the element; it only bounds the reads, the element's
/// own length byte decides where it ends.
pub fn decode_ie(buf: &[u8]) -> WpaInfo {
    let mut info = WpaInfo::default();
    if buf.len() < 2 {
        return info;
    }

    let ielen = (buf[1] as usize + 2).min(buf.len());
    let ie = &buf[..ielen];
    let mut offset = 2;

    let (ie_type, oui) = match ie[0] {
        EID_RSN => {
            if ielen < 4 {
                return info;
            }
            (IeType::Rsn, &RSN_OUI)
        }
        EID_VENDOR => {
            if ielen < 8 || !suite_matches(&ie[offset..], &WPA_OUI) || ie[offset + 3] != WPA_OUI_TYPE
            {
                return info;
            }
            offset += 4;
            (IeType::Wpa, &WPA_OUI)
        }
        _ => return info,
    };

    info.version = Some(read_u16(ie, offset));
    info.ie_type = Some(ie_type);
    offset += 2;

    // Elements without suites imply the TKIP defaults.
    if ielen < offset + 4 {
        info.group = Some(Cipher::Tkip);
        info.pairwise.push(Some(Cipher::Tkip));
        return info;
    }

    info.group = decode_cipher(&ie[offset..offset + 4], oui);
    offset += 4;

    if ielen < offset + 2 {
        info.pairwise.push(Some(Cipher::Tkip));
        return info;
    }

    let count = read_u16(ie, offset) as usize;
    offset += 2;
    if ielen < offset + 4 * count {
        return info;
    }
    info.pairwise = ie[offset..offset + 4 * count]
        .chunks_exact(4)
        .map(|suite| decode_cipher(suite, oui))
        .collect();
    offset += 4 * count;

    if ielen < offset + 2 {
        return info;
    }
    let count = read_u16(ie, offset) as usize;
    offset += 2;
    if ielen < offset + 4 * count {
        return info;
    }
    info.auth = ie[offset..offset + 4 * count]
        .chunks_exact(4)
        .map(|suite| decode_key_mgmt(suite, oui))
        .collect();

    info
}

fn decode_cipher(suite: &[u8], oui: &[u8; 3]) -> Option<Cipher> {
    if !suite_matches(suite, oui) {
        return Some(Cipher::Proprietary);
    }
    Cipher::from_selector(suite[3])
}

fn decode_key_mgmt(suite: &[u8], oui: &[u8; 3]) -> Option<KeyMgmt> {
    if !suite_matches(suite, oui) {
        return Some(KeyMgmt::Proprietary);
    }
    KeyMgmt::from_selector(suite[3])
}

/// Decode every element of a back-to-back element run.
///
/// Each element is decoded against the bytes remaining from its own offset;
/// a trailing byte that cannot hold a header ends the run.
pub fn decode_elements(buf: &[u8]) -> Vec<WpaInfo> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset + 2 <= buf.len() {
        out.push(decode_ie(&buf[offset..]));
        offset += buf[offset + 1] as usize + 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsn_ccmp_psk() -> Vec<u8> {
        vec![
            0x30, 0x14, // RSN, length 20
            0x01, 0x00, // version
            0x00, 0x0f, 0xac, 0x04, // group CCMP
            0x01, 0x00, // pairwise count
            0x00, 0x0f, 0xac, 0x04, // pairwise CCMP
            0x01, 0x00, // akm count
            0x00, 0x0f, 0xac, 0x02, // akm PSK
            0x00, 0x00, // capabilities
        ]
    }

    fn wpa1_tkip_psk() -> Vec<u8> {
        vec![
            0xdd, 0x16, // vendor, length 22
            0x00, 0x50, 0xf2, 0x01, // WPA OUI + type
            0x01, 0x00, // version
            0x00, 0x50, 0xf2, 0x02, // group TKIP
            0x01, 0x00, // pairwise count
            0x00, 0x50, 0xf2, 0x02, // pairwise TKIP
            0x01, 0x00, // akm count
            0x00, 0x50, 0xf2, 0x02, // akm PSK
        ]
    }

    #[test]
    fn decodes_rsn_element() {
        let info = decode_ie(&rsn_ccmp_psk());
        assert_eq!(
            info,
            WpaInfo {
                ie_type: Some(IeType::Rsn),
                version: Some(1),
                group: Some(Cipher::Ccmp),
                pairwise: vec![Some(Cipher::Ccmp)],
                auth: vec![Some(KeyMgmt::Psk)],
            }
        );
    }

    #[test]
    fn decodes_wpa1_element() {
        let info = decode_ie(&wpa1_tkip_psk());
        assert_eq!(info.ie_type, Some(IeType::Wpa));
        assert_eq!(info.version, Some(1));
        assert_eq!(info.group, Some(Cipher::Tkip));
        assert_eq!(info.pairwise, vec![Some(Cipher::Tkip)]);
        assert_eq!(info.auth, vec![Some(KeyMgmt::Psk)]);
    }

    #[test]
    fn short_vendor_element_is_empty() {
        let info = decode_ie(&[0xdd, 0x05, 0x00, 0x50, 0xf2, 0x01, 0x01]);
        assert!(info.is_empty());
        assert_eq!(info, WpaInfo::default());
    }

    #[test]
    fn foreign_vendor_element_is_empty() {
        let mut ie = wpa1_tkip_psk();
        ie[4] = 0x00; // OUI 00:50:00
        assert!(decode_ie(&ie).is_empty());

        let mut ie = wpa1_tkip_psk();
        ie[5] = 0x04; // WPS type
        assert!(decode_ie(&ie).is_empty());
    }

    #[test]
    fn version_only_defaults_to_tkip() {
        let info = decode_ie(&[0x30, 0x02, 0x01, 0x00]);
        assert_eq!(info.ie_type, Some(IeType::Rsn));
        assert_eq!(info.group, Some(Cipher::Tkip));
        assert_eq!(info.pairwise, vec![Some(Cipher::Tkip)]);
        assert!(info.auth.is_empty());
    }

    #[test]
    fn missing_pairwise_count_defaults_pairwise() {
        let info = decode_ie(&[0x30, 0x06, 0x01, 0x00, 0x00, 0x0f, 0xac, 0x04]);
        assert_eq!(info.group, Some(Cipher::Ccmp));
        assert_eq!(info.pairwise, vec![Some(Cipher::Tkip)]);
    }

    #[test]
    fn truncated_pairwise_list_is_dropped() {
        let mut ie = rsn_ccmp_psk();
        ie[8] = 0x05; // claims five pairwise suites
        let info = decode_ie(&ie);
        assert_eq!(info.group, Some(Cipher::Ccmp));
        assert!(info.pairwise.is_empty());
        assert!(info.auth.is_empty());
    }

    #[test]
    fn declared_length_is_clamped_to_buffer() {
        let mut ie = rsn_ccmp_psk();
        ie.truncate(16); // cut inside the AKM list
        let info = decode_ie(&ie);
        assert_eq!(info.pairwise, vec![Some(Cipher::Ccmp)]);
        assert!(info.auth.is_empty());
    }

    #[test]
    fn proprietary_and_unknown_selectors() {
        let mut ie = rsn_ccmp_psk();
        ie[4] = 0x00;
        ie[5] = 0x10;
        ie[6] = 0x18; // group from another vendor
        ie[13] = 0x08; // GCMP, not in the table
        let info = decode_ie(&ie);
        assert_eq!(info.group, Some(Cipher::Proprietary));
        assert_eq!(info.pairwise, vec![None]);
    }

    #[test]
    fn element_run_decodes_each_element() {
        let mut run = rsn_ccmp_psk();
        run.extend(wpa1_tkip_psk());
        let all = decode_elements(&run);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].ie_type, Some(IeType::Rsn));
        assert_eq!(all[1].ie_type, Some(IeType::Wpa));
    }

    #[test]
    fn serializes_with_names() {
        let json = serde_json::to_value(decode_ie(&rsn_ccmp_psk())).unwrap();
        assert_eq!(json["type"], "IEEE 802.11i/WPA2");
        assert_eq!(json["group"], "CCMP");
        assert_eq!(json["pairwise"][0], "CCMP");
        assert_eq!(json["auth"][0], "PSK");
    }
}
