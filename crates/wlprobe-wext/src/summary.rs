use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::ie::IeType;
use crate::record::AccessPointRecord;

static STRENGTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*Quality:?=? ?(\d+)\s*/?\s*(\d*)").expect("valid regex"));
static ALT_STRENGTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*Signal level:?=? ?(\d\d*)").expect("valid regex"));
static SIGNAL_DBM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*Signal level:?=? ?(-\d\d*)").expect("valid regex"));

/// Name shown for networks that do not broadcast an ESSID.
pub const HIDDEN_ESSID: &str = "Hidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncryptionMethod {
    #[serde(rename = "WPA2")]
    Wpa2,
    #[serde(rename = "WPA")]
    Wpa,
    #[serde(rename = "WEP")]
    Wep,
}

impl EncryptionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMethod::Wpa2 => "WPA2",
            EncryptionMethod::Wpa => "WPA",
            EncryptionMethod::Wep => "WEP",
        }
    }
}

/// Connection-manager view of a scanned network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub essid: String,
    pub hidden: bool,
    pub channel: Option<i32>,
    pub bssid: Option<String>,
    pub mode: Option<String>,
    pub encryption: bool,
    pub encryption_method: Option<EncryptionMethod>,
    /// Link quality in percent when the driver reports a maximum, else the raw value.
    pub quality: Option<i32>,
    /// Signal level in dBm.
    pub strength: Option<i32>,
}

impl NetworkSummary {
    pub fn from_record(record: &AccessPointRecord) -> Self {
        let essid = record.essid.clone().unwrap_or_default();
        let hidden = essid.is_empty() || essid == "<hidden>";

        let encryption = record.enc.unwrap_or(false);
        let encryption_method = if encryption {
            Some(match record.ie.as_ref().and_then(|ie| ie.ie_type) {
                Some(IeType::Rsn) => EncryptionMethod::Wpa2,
                Some(IeType::Wpa) => EncryptionMethod::Wpa,
                None => EncryptionMethod::Wep,
            })
        } else {
            None
        };

        let stats = record.stats.as_deref().unwrap_or("");

        Self {
            essid: if hidden { HIDDEN_ESSID.to_string() } else { essid },
            hidden,
            channel: record.channel,
            bssid: record.bssid.clone(),
            mode: record.mode.clone(),
            encryption,
            encryption_method,
            quality: link_quality(stats),
            strength: signal_dbm(stats),
        }
    }
}

/// Link quality from a stats string: `Quality:q/max` as a percentage, a bare
/// quality value, or failing that the positive signal level.
pub fn link_quality(stats: &str) -> Option<i32> {
    if let Some(caps) = STRENGTH.captures(stats) {
        let strength: Option<i32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let max: Option<i32> = caps
            .get(2)
            .filter(|m| !m.as_str().is_empty())
            .and_then(|m| m.as_str().parse().ok());
        match (strength, max) {
            (Some(q), Some(max)) if max > 0 => return Some(100 * q / max),
            (Some(q), None) => return Some(q),
            _ => {}
        }
    }
    ALT_STRENGTH
        .captures(stats)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Signal level in dBm, when the stats string carries a negative level.
pub fn signal_dbm(stats: &str) -> Option<i32> {
    SIGNAL_DBM
        .captures(stats)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ie::WpaInfo;

    fn record(essid: &str, enc: bool, ie: Option<IeType>, stats: &str) -> AccessPointRecord {
        AccessPointRecord {
            bssid: Some("00:11:22:33:44:55".into()),
            essid: Some(essid.into()),
            channel: Some(11),
            mode: Some("Master".into()),
            enc: Some(enc),
            stats: Some(stats.into()),
            ie: ie.map(|t| WpaInfo {
                ie_type: Some(t),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn hidden_networks() {
        let s = NetworkSummary::from_record(&record("", false, None, ""));
        assert!(s.hidden);
        assert_eq!(s.essid, HIDDEN_ESSID);

        let s = NetworkSummary::from_record(&record("<hidden>", false, None, ""));
        assert!(s.hidden);

        let s = NetworkSummary::from_record(&record("home", false, None, ""));
        assert!(!s.hidden);
        assert_eq!(s.essid, "home");
        assert_eq!(s.channel, Some(11));
    }

    #[test]
    fn encryption_method_from_ie() {
        let wpa2 = NetworkSummary::from_record(&record("a", true, Some(IeType::Rsn), ""));
        assert_eq!(wpa2.encryption_method, Some(EncryptionMethod::Wpa2));

        let wpa = NetworkSummary::from_record(&record("a", true, Some(IeType::Wpa), ""));
        assert_eq!(wpa.encryption_method, Some(EncryptionMethod::Wpa));

        let wep = NetworkSummary::from_record(&record("a", true, None, ""));
        assert_eq!(wep.encryption_method, Some(EncryptionMethod::Wep));

        let open = NetworkSummary::from_record(&record("a", false, Some(IeType::Rsn), ""));
        assert!(!open.encryption);
        assert_eq!(open.encryption_method, None);
    }

    #[test]
    fn quality_from_stats() {
        assert_eq!(link_quality("Quality=45/70  Signal level=-65 dBm  "), Some(64));
        assert_eq!(
            link_quality("Quality:40  Signal level:200  Noise level:161"),
            Some(40)
        );
        assert_eq!(link_quality("Signal level:55/100  "), Some(55));
        assert_eq!(link_quality("Signal level:-75.5 dBm  "), None);
        assert_eq!(link_quality(""), None);
    }

    #[test]
    fn signal_level_in_dbm() {
        assert_eq!(signal_dbm("Quality=45/70  Signal level=-65 dBm  "), Some(-65));
        assert_eq!(signal_dbm("Quality:60/100  Signal level:55/100  "), None);
    }

    #[test]
    fn summary_serializes_method_names() {
        let s = NetworkSummary::from_record(&record("a", true, Some(IeType::Rsn), ""));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["encryption_method"], "WPA2");
        assert_eq!(json["quality"], serde_json::Value::Null);
    }
}
