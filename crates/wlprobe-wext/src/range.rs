//! Driver capability ("range") information and channel/frequency lookups.
//!
//! The range descriptor is returned by `SIOCGIWRANGE`. Only the parts needed to
//! interpret scan values are kept: the wireless-extensions version the driver
//! was built against, the maximum quality triple and the frequency table.

const KILO: f64 = 1e3;

/// Upper bound on frequency table entries (`IW_MAX_FREQUENCIES`).
pub const MAX_FREQUENCIES: usize = 32;

// Offsets into `struct iw_range` (wireless extensions 16+).
const RANGE_MAX_QUAL: usize = 44;
const RANGE_WE_VERSION_COMPILED: usize = 280;
const RANGE_NUM_FREQUENCY: usize = 306;
const RANGE_FREQ: usize = 308;
const IW_FREQ_LEN: usize = 8;

/// Size of the buffer handed to `SIOCGIWRANGE`; larger than any `iw_range`.
pub const RANGE_BUFFER_LEN: usize = 1024;

/// `struct iw_freq`: a mantissa/exponent frequency or a channel number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IwFreq {
    pub m: i32,
    pub e: i16,
    pub i: u8,
    pub flags: u8,
}

impl IwFreq {
    pub(crate) fn from_bytes(b: &[u8]) -> Option<Self> {
        if b.len() < IW_FREQ_LEN {
            return None;
        }
        Some(Self {
            m: i32::from_ne_bytes([b[0], b[1], b[2], b[3]]),
            e: i16::from_ne_bytes([b[4], b[5]]),
            i: b[6],
            flags: b[7],
        })
    }

    /// Value as a float, `m * 10^e`. Negative exponents are ignored the same
    /// way the kernel encoding ignores them.
    pub fn to_f64(&self) -> f64 {
        let mut value = self.m as f64;
        for _ in 0..self.e.max(0) {
            value *= 10.0;
        }
        value
    }
}

/// `struct iw_quality`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IwQuality {
    pub qual: u8,
    pub level: u8,
    pub noise: u8,
    pub updated: u8,
}

impl IwQuality {
    pub(crate) fn from_bytes(b: &[u8]) -> Option<Self> {
        if b.len() < 4 {
            return None;
        }
        Some(Self {
            qual: b[0],
            level: b[1],
            noise: b[2],
            updated: b[3],
        })
    }
}

/// Capability descriptor of a wireless driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeInfo {
    pub we_version_compiled: u8,
    pub max_qual: IwQuality,
    pub frequencies: Vec<IwFreq>,
}

impl RangeInfo {
    /// Parse the raw `struct iw_range` returned by the driver.
    ///
    /// Returns `None` when the buffer is too short to hold the fields we use.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < RANGE_FREQ {
            return None;
        }
        let max_qual = IwQuality::from_bytes(&buf[RANGE_MAX_QUAL..RANGE_MAX_QUAL + 4])?;
        let we_version_compiled = buf[RANGE_WE_VERSION_COMPILED];
        let count = (buf[RANGE_NUM_FREQUENCY] as usize).min(MAX_FREQUENCIES);

        let frequencies = buf[RANGE_FREQ..]
            .chunks_exact(IW_FREQ_LEN)
            .take(count)
            .filter_map(IwFreq::from_bytes)
            .collect();

        Some(Self {
            we_version_compiled,
            max_qual,
            frequencies,
        })
    }

    /// Look up the frequency (Hz) of `channel` in the driver table.
    ///
    /// Returns `None` when the driver table only lists channels or does not
    /// contain the channel.
    pub fn channel_to_freq(&self, channel: i32) -> Option<f64> {
        let has_freq = self
            .frequencies
            .iter()
            .any(|f| f.e != 0 || f.m > KILO as i32);
        if !has_freq {
            return None;
        }
        self.frequencies
            .iter()
            .find(|f| i32::from(f.i) == channel)
            .map(IwFreq::to_f64)
    }

    /// Look up the channel of an exact frequency (Hz) in the driver table.
    pub fn freq_to_channel(&self, freq: f64) -> Option<i32> {
        if freq < KILO {
            return None;
        }
        self.frequencies
            .iter()
            .find(|f| f.to_f64() == freq)
            .map(|f| i32::from(f.i))
    }
}

/// Standard 802.11 channel plan, channel to centre frequency in MHz.
pub fn standard_channel_to_mhz(channel: i32) -> Option<u32> {
    match channel {
        1..=13 => Some(2407 + 5 * channel as u32),
        14 => Some(2484),
        32..=68 | 96..=144 if channel % 4 == 0 => Some(5000 + 5 * channel as u32),
        149..=177 if channel % 4 == 1 => Some(5000 + 5 * channel as u32),
        _ => None,
    }
}

/// Standard 802.11 channel plan, centre frequency in MHz to channel.
pub fn standard_mhz_to_channel(mhz: u32) -> Option<i32> {
    match mhz {
        2412..=2472 if (mhz - 2407) % 5 == 0 => Some(((mhz - 2407) / 5) as i32),
        2484 => Some(14),
        5160..=5885 if mhz % 5 == 0 => {
            let channel = ((mhz - 5000) / 5) as i32;
            standard_channel_to_mhz(channel).map(|_| channel)
        }
        _ => None,
    }
}

/// Resolve a channel from a frequency in Hz, preferring the driver table.
pub fn resolve_channel(freq: f64, range: Option<&RangeInfo>) -> Option<i32> {
    if let Some(channel) = range.and_then(|r| r.freq_to_channel(freq)) {
        return Some(channel);
    }
    if freq < KILO {
        return None;
    }
    let mhz = (freq / 1e6).round();
    if mhz <= 0.0 || mhz > u32::MAX as f64 {
        return None;
    }
    standard_mhz_to_channel(mhz as u32)
}

/// Resolve the frequency (Hz) of a channel, preferring the driver table.
pub fn resolve_frequency(channel: i32, range: Option<&RangeInfo>) -> Option<f64> {
    if let Some(freq) = range.and_then(|r| r.channel_to_freq(channel)) {
        return Some(freq);
    }
    standard_channel_to_mhz(channel).map(|mhz| f64::from(mhz) * 1e6)
}
