//! Conversion of raw scan events into record fields.

use crate::format::{format_bitrate, format_ether, format_frequency, format_stats};
use crate::ie::{decode_elements, WpaInfo};
use crate::range::{resolve_channel, resolve_frequency, RangeInfo};
use crate::stream::{RawEvent, IW_ENCODE_DISABLED, IW_ESSID_MAX_SIZE};

/// Operating mode names indexed by the `SIOCGIWMODE` value.
pub const OPERATION_MODES: [&str; 7] = [
    "Auto",
    "Ad-Hoc",
    "Managed",
    "Master",
    "Repeater",
    "Secondary",
    "Monitor",
];

/// Name used for mode values outside [`OPERATION_MODES`].
pub const UNKNOWN_MODE: &str = "Unknown/bug";

/// One key/value produced from a scan event.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedField {
    Bssid(String),
    Frequency(String),
    Channel(i32),
    Mode(&'static str),
    Protocol(String),
    Essid(String),
    Enc(bool),
    Bitrate(String),
    Qual(i32),
    Stats(String),
    Ie(WpaInfo),
}

impl DecodedField {
    /// Record key this field fills.
    pub fn key(&self) -> &'static str {
        match self {
            DecodedField::Bssid(_) => "bssid",
            DecodedField::Frequency(_) => "frequency",
            DecodedField::Channel(_) => "channel",
            DecodedField::Mode(_) => "mode",
            DecodedField::Protocol(_) => "protocol",
            DecodedField::Essid(_) => "essid",
            DecodedField::Enc(_) => "enc",
            DecodedField::Bitrate(_) => "bitrate",
            DecodedField::Qual(_) => "qual",
            DecodedField::Stats(_) => "stats",
            DecodedField::Ie(_) => "ie",
        }
    }
}

/// Decode one event. `range` is the driver capability info when it could be
/// read; without it stats fall back to raw values and channels to the standard
/// channel plan.
pub fn decode_event(event: &RawEvent<'_>, range: Option<&RangeInfo>) -> Vec<DecodedField> {
    match *event {
        RawEvent::Address(addr) => vec![DecodedField::Bssid(format_ether(&addr))],
        RawEvent::Frequency(freq) => {
            let value = freq.to_f64();
            let (freq_hz, channel) = if value <= 14.0 {
                let channel = value as i32;
                match resolve_frequency(channel, range) {
                    Some(hz) => (hz, Some(channel)),
                    None => (value, None),
                }
            } else {
                (value, resolve_channel(value, range))
            };

            let mut fields = vec![DecodedField::Frequency(format_frequency(freq_hz))];
            if let Some(channel) = channel {
                fields.push(DecodedField::Channel(channel));
            }
            fields
        }
        RawEvent::Mode(mode) => {
            let name = OPERATION_MODES
                .get(mode as usize)
                .copied()
                .unwrap_or(UNKNOWN_MODE);
            vec![DecodedField::Mode(name)]
        }
        RawEvent::ProtocolName(name) => vec![DecodedField::Protocol(c_string(name))],
        RawEvent::Essid { essid, .. } => {
            let len = essid.len().min(IW_ESSID_MAX_SIZE);
            vec![DecodedField::Essid(c_string(&essid[..len]))]
        }
        RawEvent::Encode { flags, .. } => {
            vec![DecodedField::Enc(flags & IW_ENCODE_DISABLED == 0)]
        }
        RawEvent::Bitrate(rate) => vec![DecodedField::Bitrate(format_bitrate(rate))],
        RawEvent::Quality(qual) => vec![
            DecodedField::Qual(i32::from(qual.qual)),
            DecodedField::Stats(format_stats(&qual, range)),
        ],
        // A run may hold several elements; the record keeps the last one.
        RawEvent::GenericIe(ies) => decode_elements(ies)
            .pop()
            .map(DecodedField::Ie)
            .into_iter()
            .collect(),
    }
}

/// Bytes up to the first NUL as text.
fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ie::{Cipher, IeType};
    use crate::range::{IwFreq, IwQuality};

    fn freq_event(m: i32, e: i16) -> RawEvent<'static> {
        RawEvent::Frequency(IwFreq {
            m,
            e,
            i: 0,
            flags: 0,
        })
    }

    #[test]
    fn address_becomes_bssid() {
        let fields = decode_event(&RawEvent::Address([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]), None);
        assert_eq!(fields, vec![DecodedField::Bssid("DE:AD:BE:EF:00:01".into())]);
    }

    #[test]
    fn frequency_yields_channel() {
        let fields = decode_event(&freq_event(241_200_000, 1), None);
        assert_eq!(
            fields,
            vec![
                DecodedField::Frequency("2.412 GHz".into()),
                DecodedField::Channel(1)
            ]
        );

        let fields = decode_event(&freq_event(518_000_000, 1), None);
        assert_eq!(
            fields,
            vec![
                DecodedField::Frequency("5.18 GHz".into()),
                DecodedField::Channel(36)
            ]
        );
    }

    #[test]
    fn channel_number_is_resolved_to_frequency() {
        let fields = decode_event(&freq_event(6, 0), None);
        assert_eq!(
            fields,
            vec![
                DecodedField::Frequency("2.437 GHz".into()),
                DecodedField::Channel(6)
            ]
        );
    }

    #[test]
    fn driver_table_wins_over_standard_plan() {
        let range = RangeInfo {
            frequencies: vec![IwFreq {
                m: 242_200_000,
                e: 1,
                i: 99,
                flags: 0,
            }],
            ..Default::default()
        };
        let fields = decode_event(&freq_event(242_200_000, 1), Some(&range));
        assert_eq!(fields[1], DecodedField::Channel(99));
    }

    #[test]
    fn unresolvable_channel_is_absent() {
        let fields = decode_event(&freq_event(0, 0), None);
        assert_eq!(fields, vec![DecodedField::Frequency("0".into())]);

        let fields = decode_event(&freq_event(20, 0), None);
        assert_eq!(fields, vec![DecodedField::Frequency("20".into())]);

        let fields = decode_event(&freq_event(123_456_789, 1), None);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn mode_names() {
        assert_eq!(
            decode_event(&RawEvent::Mode(3), None),
            vec![DecodedField::Mode("Master")]
        );
        assert_eq!(
            decode_event(&RawEvent::Mode(42), None),
            vec![DecodedField::Mode(UNKNOWN_MODE)]
        );
    }

    #[test]
    fn text_fields_stop_at_nul() {
        let mut name = [0u8; 16];
        name[..13].copy_from_slice(b"IEEE 802.11bg");
        assert_eq!(
            decode_event(&RawEvent::ProtocolName(&name), None),
            vec![DecodedField::Protocol("IEEE 802.11bg".into())]
        );
        assert_eq!(
            decode_event(
                &RawEvent::Essid {
                    flags: 1,
                    essid: b"cafe\0junk"
                },
                None
            ),
            vec![DecodedField::Essid("cafe".into())]
        );
    }

    #[test]
    fn encryption_flag() {
        let on = decode_event(&RawEvent::Encode { flags: 0x0800, key: &[] }, None);
        let off = decode_event(
            &RawEvent::Encode {
                flags: IW_ENCODE_DISABLED,
                key: &[],
            },
            None,
        );
        assert_eq!(on, vec![DecodedField::Enc(true)]);
        assert_eq!(off, vec![DecodedField::Enc(false)]);
    }

    #[test]
    fn quality_yields_qual_and_stats() {
        let qual = IwQuality {
            qual: 35,
            level: 180,
            noise: 0,
            updated: 0,
        };
        let fields = decode_event(&RawEvent::Quality(qual), None);
        assert_eq!(fields[0], DecodedField::Qual(35));
        assert_eq!(fields[0].key(), "qual");
        assert_eq!(fields[1].key(), "stats");
    }

    #[test]
    fn generic_ie_keeps_last_element() {
        let run = [
            0x30, 0x02, 0x01, 0x00, // RSN with version only
            0xdd, 0x06, 0x00, 0x50, 0xf2, 0x01, 0x01, 0x00, // WPA with version only
        ];
        let fields = decode_event(&RawEvent::GenericIe(&run), None);
        match &fields[..] {
            [DecodedField::Ie(info)] => {
                assert_eq!(info.ie_type, Some(IeType::Wpa));
                assert_eq!(info.group, Some(Cipher::Tkip));
            }
            other => panic!("unexpected fields {:?}", other),
        }
        assert!(decode_event(&RawEvent::GenericIe(&[]), None).is_empty());
    }
}
