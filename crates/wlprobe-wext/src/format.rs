//! Human-readable rendering of scan values, matching the classic `iwlist`
//! output so existing parsers of that text keep working.

use crate::range::{IwQuality, RangeInfo};

const KILO: f64 = 1e3;
const MEGA: f64 = 1e6;
const GIGA: f64 = 1e9;

// `iw_quality.updated` bits
pub const IW_QUAL_QUAL_UPDATED: u8 = 0x01;
pub const IW_QUAL_LEVEL_UPDATED: u8 = 0x02;
pub const IW_QUAL_NOISE_UPDATED: u8 = 0x04;
pub const IW_QUAL_DBM: u8 = 0x08;
pub const IW_QUAL_QUAL_INVALID: u8 = 0x10;
pub const IW_QUAL_LEVEL_INVALID: u8 = 0x20;
pub const IW_QUAL_NOISE_INVALID: u8 = 0x40;
pub const IW_QUAL_RCPI: u8 = 0x80;

/// Format a float the way C's `%g` does: six significant digits, trailing
/// zeros removed, scientific notation for very large or small magnitudes.
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    // The exponent after rounding to six significant digits decides the style.
    let sci = format!("{:.5e}", value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs());
    }

    let decimals = (5 - exp).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn scale(value: f64) -> (f64, char) {
    if value >= GIGA {
        (value / GIGA, 'G')
    } else if value >= MEGA {
        (value / MEGA, 'M')
    } else {
        (value / KILO, 'k')
    }
}

/// Render a frequency in Hz, e.g. `2.412 GHz`. Channel numbers (below 1 kHz)
/// are printed bare.
pub fn format_frequency(freq: f64) -> String {
    if freq < KILO {
        return format_g(freq);
    }
    let (value, unit) = scale(freq);
    format!("{} {}Hz", format_g(value), unit)
}

/// Render a bitrate in b/s, e.g. `54 Mb/s`.
pub fn format_bitrate(bitrate: i32) -> String {
    let (value, unit) = scale(f64::from(bitrate));
    format!("{} {}b/s", format_g(value), unit)
}

/// Render a link-layer address as upper-case colon-separated hex.
pub fn format_ether(addr: &[u8; 6]) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        addr[0], addr[1], addr[2], addr[3], addr[4], addr[5]
    )
}

fn marker(updated: u8, bit: u8) -> char {
    if updated & bit != 0 {
        '='
    } else {
        ':'
    }
}

/// Render link statistics.
///
/// With range information the quality is shown relative to the driver maximum
/// and levels are shown in dBm, RCPI or relative units depending on the flags.
/// Without it only the raw bytes are shown.
pub fn format_stats(qual: &IwQuality, range: Option<&RangeInfo>) -> String {
    let range = match range {
        Some(range)
            if qual.level != 0 || qual.updated & (IW_QUAL_DBM | IW_QUAL_RCPI) != 0 =>
        {
            range
        }
        _ => {
            return format!(
                "Quality:{}  Signal level:{}  Noise level:{}",
                qual.qual, qual.level, qual.noise
            )
        }
    };

    let mut out = String::new();
    if qual.updated & IW_QUAL_QUAL_INVALID == 0 {
        out.push_str(&format!(
            "Quality{}{}/{}  ",
            marker(qual.updated, IW_QUAL_QUAL_UPDATED),
            qual.qual,
            range.max_qual.qual
        ));
    }

    if qual.updated & IW_QUAL_RCPI != 0 {
        // RCPI = (dBm + 110) * 2
        if qual.updated & IW_QUAL_LEVEL_INVALID == 0 {
            let level = f64::from(qual.level) / 2.0 - 110.0;
            out.push_str(&format!(
                "Signal level{}{} dBm  ",
                marker(qual.updated, IW_QUAL_LEVEL_UPDATED),
                format_g(level)
            ));
        }
        if qual.updated & IW_QUAL_NOISE_INVALID == 0 {
            let noise = f64::from(qual.noise) / 2.0 - 110.0;
            out.push_str(&format!(
                "Noise level{}{} dBm",
                marker(qual.updated, IW_QUAL_NOISE_UPDATED),
                format_g(noise)
            ));
        }
    } else if qual.updated & IW_QUAL_DBM != 0 || qual.level > range.max_qual.level {
        if qual.updated & IW_QUAL_LEVEL_INVALID == 0 {
            out.push_str(&format!(
                "Signal level{}{} dBm  ",
                marker(qual.updated, IW_QUAL_LEVEL_UPDATED),
                dbm(qual.level)
            ));
        }
        if qual.updated & IW_QUAL_NOISE_INVALID == 0 {
            out.push_str(&format!(
                "Noise level{}{} dBm",
                marker(qual.updated, IW_QUAL_NOISE_UPDATED),
                dbm(qual.noise)
            ));
        }
    } else {
        if qual.updated & IW_QUAL_LEVEL_INVALID == 0 {
            out.push_str(&format!(
                "Signal level{}{}/{}  ",
                marker(qual.updated, IW_QUAL_LEVEL_UPDATED),
                qual.level,
                range.max_qual.level
            ));
        }
        if qual.updated & IW_QUAL_NOISE_INVALID == 0 {
            out.push_str(&format!(
                "Noise level{}{}/{}",
                marker(qual.updated, IW_QUAL_NOISE_UPDATED),
                qual.noise,
                range.max_qual.noise
            ));
        }
    }
    out
}

/// dBm values are carried as u8 in the range [-192; 63].
fn dbm(raw: u8) -> i32 {
    let value = i32::from(raw);
    if value >= 64 {
        value - 0x100
    } else {
        value
    }
}
