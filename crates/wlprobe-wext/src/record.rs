use log::trace;
use serde::Serialize;

use crate::decode::{decode_event, DecodedField};
use crate::ie::WpaInfo;
use crate::range::RangeInfo;
use crate::stream::EventStream;

/// One scanned cell.
///
/// Every key is always present; unset values serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessPointRecord {
    pub bssid: Option<String>,
    pub frequency: Option<String>,
    pub channel: Option<i32>,
    pub mode: Option<String>,
    pub protocol: Option<String>,
    pub essid: Option<String>,
    pub enc: Option<bool>,
    pub bitrate: Option<String>,
    pub qual: Option<i32>,
    pub stats: Option<String>,
    pub ie: Option<WpaInfo>,
}

impl AccessPointRecord {
    /// Record keys in output order.
    pub const KEYS: [&'static str; 11] = [
        "bssid",
        "frequency",
        "channel",
        "mode",
        "protocol",
        "essid",
        "enc",
        "bitrate",
        "qual",
        "stats",
        "ie",
    ];

    /// Store a field, replacing any earlier value for the same key.
    pub fn apply(&mut self, field: DecodedField) {
        match field {
            DecodedField::Bssid(v) => self.bssid = Some(v),
            DecodedField::Frequency(v) => self.frequency = Some(v),
            DecodedField::Channel(v) => self.channel = Some(v),
            DecodedField::Mode(v) => self.mode = Some(v.to_string()),
            DecodedField::Protocol(v) => self.protocol = Some(v),
            DecodedField::Essid(v) => self.essid = Some(v),
            DecodedField::Enc(v) => self.enc = Some(v),
            DecodedField::Bitrate(v) => self.bitrate = Some(v),
            DecodedField::Qual(v) => self.qual = Some(v),
            DecodedField::Stats(v) => self.stats = Some(v),
            DecodedField::Ie(v) => self.ie = Some(v),
        }
    }
}

/// Decode a complete scan buffer into records, in the order the driver
/// emitted the cells.
///
/// A record starts at every address event. Events before the first address
/// belong to no cell and are dropped.
pub fn assemble_records(
    buf: &[u8],
    we_version: u8,
    range: Option<&RangeInfo>,
) -> Vec<AccessPointRecord> {
    let mut records = Vec::new();
    let mut current: Option<AccessPointRecord> = None;

    for event in EventStream::new(buf, we_version) {
        if event.starts_cell() {
            if let Some(done) = current.take() {
                records.push(done);
            }
            current = Some(AccessPointRecord::default());
        }

        let Some(record) = current.as_mut() else {
            trace!("[SCAN] dropping {:?} outside any cell", event);
            continue;
        };
        for field in decode_event(&event, range) {
            record.apply(field);
        }
    }

    if let Some(done) = current {
        records.push(done);
    }
    records
}
