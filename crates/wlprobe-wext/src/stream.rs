//! Reader for the wireless-extensions scan event stream.
//!
//! `SIOCGIWSCAN` fills a buffer with back-to-back events. Every event starts
//! with a `u16 len, u16 cmd` header followed by a command-specific fixed part;
//! "point" events additionally carry a variable payload. Events are packed and
//! use the host byte order.

use log::{debug, trace};

use crate::range::{IwFreq, IwQuality};

// Standard ioctls carried in scan results
pub const SIOCGIWNAME: u16 = 0x8B01;
pub const SIOCGIWFREQ: u16 = 0x8B05;
pub const SIOCGIWMODE: u16 = 0x8B07;
pub const SIOCGIWAP: u16 = 0x8B15;
pub const SIOCGIWESSID: u16 = 0x8B1B;
pub const SIOCGIWRATE: u16 = 0x8B21;
pub const SIOCGIWENCODE: u16 = 0x8B2B;

// Wireless events
pub const IWEVQUAL: u16 = 0x8C01;
pub const IWEVCUSTOM: u16 = 0x8C02;
pub const IWEVGENIE: u16 = 0x8C05;

/// Encode flag: encryption disabled.
pub const IW_ENCODE_DISABLED: u16 = 0x8000;

/// Maximum ESSID length in bytes.
pub const IW_ESSID_MAX_SIZE: usize = 32;

const IW_EV_LCP_PK_LEN: usize = 4;
const IW_ENCODING_TOKEN_MAX: usize = 64;
const IW_GENERIC_IE_MAX: usize = 1024;
const IW_CUSTOM_MAX: usize = 256;

/// Layout class of an event's fixed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderType {
    Char,
    Uint,
    Freq,
    Addr,
    Point { max_tokens: usize },
    Param,
    Qual,
}

impl HeaderType {
    fn for_cmd(cmd: u16) -> Option<Self> {
        match cmd {
            SIOCGIWNAME => Some(HeaderType::Char),
            SIOCGIWFREQ => Some(HeaderType::Freq),
            SIOCGIWMODE => Some(HeaderType::Uint),
            SIOCGIWAP => Some(HeaderType::Addr),
            SIOCGIWESSID => Some(HeaderType::Point {
                max_tokens: IW_ESSID_MAX_SIZE + 1,
            }),
            SIOCGIWRATE => Some(HeaderType::Param),
            SIOCGIWENCODE => Some(HeaderType::Point {
                max_tokens: IW_ENCODING_TOKEN_MAX,
            }),
            IWEVQUAL => Some(HeaderType::Qual),
            IWEVGENIE => Some(HeaderType::Point {
                max_tokens: IW_GENERIC_IE_MAX,
            }),
            IWEVCUSTOM => Some(HeaderType::Point {
                max_tokens: IW_CUSTOM_MAX,
            }),
            _ => None,
        }
    }

    /// Size of the fixed part following the 4-byte header.
    fn fixed_len(&self, we_version: u8) -> usize {
        match self {
            HeaderType::Char => 16,
            HeaderType::Uint => 4,
            HeaderType::Freq => 8,
            HeaderType::Addr => 16,
            HeaderType::Param => 8,
            HeaderType::Qual => 4,
            // Before WE-19 the user-space pointer was left in the stream.
            HeaderType::Point { .. } if we_version <= 18 => 4 + std::mem::size_of::<usize>(),
            HeaderType::Point { .. } => 4,
        }
    }
}

/// One event extracted from the scan stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent<'a> {
    /// Link-layer address of a new cell.
    Address([u8; 6]),
    Frequency(IwFreq),
    Mode(u32),
    /// Fixed 16-byte, NUL-padded protocol name.
    ProtocolName(&'a [u8]),
    Essid { flags: u16, essid: &'a [u8] },
    Encode { flags: u16, key: &'a [u8] },
    Bitrate(i32),
    Quality(IwQuality),
    GenericIe(&'a [u8]),
}

impl RawEvent<'_> {
    /// Whether this event opens a new access point record.
    pub fn starts_cell(&self) -> bool {
        matches!(self, RawEvent::Address(_))
    }
}

/// Outcome of one extraction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract<'a> {
    Event(RawEvent<'a>),
    End,
    Malformed { offset: usize, reason: &'static str },
}

/// Cursor over a scan buffer.
///
/// Iterating yields events until the end of the buffer or the first malformed
/// event; the stream cannot be restarted.
pub struct EventStream<'a> {
    buf: &'a [u8],
    current: usize,
    value: Option<usize>,
    we_version: u8,
    finished: bool,
}

impl<'a> EventStream<'a> {
    /// `we_version` is the wireless-extensions version the driver was compiled
    /// against, as reported in its range information.
    pub fn new(buf: &'a [u8], we_version: u8) -> Self {
        Self {
            buf,
            current: 0,
            value: None,
            we_version,
            finished: false,
        }
    }

    /// Extract the next known event, skipping unknown and custom ones.
    pub fn extract(&mut self) -> Extract<'a> {
        loop {
            if self.finished {
                return Extract::End;
            }
            match self.step() {
                Step::Event(event) => return Extract::Event(event),
                Step::Skip => continue,
                Step::End => {
                    self.finished = true;
                    return Extract::End;
                }
                Step::Malformed(reason) => {
                    self.finished = true;
                    return Extract::Malformed {
                        offset: self.current,
                        reason,
                    };
                }
            }
        }
    }

    fn step(&mut self) -> Step<'a> {
        let buf = self.buf;
        let start = self.current;
        if start + IW_EV_LCP_PK_LEN > buf.len() {
            return Step::End;
        }

        let len = u16::from_ne_bytes([buf[start], buf[start + 1]]) as usize;
        let cmd = u16::from_ne_bytes([buf[start + 2], buf[start + 3]]);
        if len <= IW_EV_LCP_PK_LEN {
            return Step::Malformed("event length shorter than header");
        }
        let end = start + len;

        let header = match HeaderType::for_cmd(cmd) {
            Some(header) => header,
            None => {
                trace!("[SCAN] skipping unknown event 0x{:04x} ({} bytes)", cmd, len);
                self.advance(end);
                return Step::Skip;
            }
        };

        let fixed_len = header.fixed_len(self.we_version);
        let at = self.value.unwrap_or(start + IW_EV_LCP_PK_LEN);
        if at + fixed_len > buf.len() {
            return Step::Malformed("event runs past end of buffer");
        }
        let fixed = &buf[at..at + fixed_len];
        let after = at + fixed_len;

        if let HeaderType::Point { max_tokens } = header {
            // The 16-bit length/flags pair sits at the end of the fixed part.
            let meta = &fixed[fixed_len - 4..];
            let length = u16::from_ne_bytes([meta[0], meta[1]]) as usize;
            let flags = u16::from_ne_bytes([meta[2], meta[3]]);
            let extra_len = len.saturating_sub(IW_EV_LCP_PK_LEN + fixed_len);
            let available = end.min(buf.len()).saturating_sub(after);

            let payload = if length == 0 || extra_len == 0 {
                &buf[after..after]
            } else if length > extra_len || length > max_tokens {
                debug!(
                    "[SCAN] dropping payload of event 0x{:04x}: {} tokens, {} bytes carried",
                    cmd, length, extra_len
                );
                &buf[after..after]
            } else {
                &buf[after..after + length.min(available)]
            };

            self.advance(end);
            return match cmd {
                SIOCGIWESSID => Step::Event(RawEvent::Essid {
                    flags,
                    essid: payload,
                }),
                SIOCGIWENCODE => Step::Event(RawEvent::Encode {
                    flags,
                    key: payload,
                }),
                IWEVGENIE => Step::Event(RawEvent::GenericIe(payload)),
                _ => Step::Skip,
            };
        }

        // Fixed-size events may pack several values (e.g. bitrate lists).
        if after + fixed_len <= end {
            self.value = Some(after);
        } else {
            self.advance(end);
        }

        let event = match header {
            HeaderType::Char => RawEvent::ProtocolName(fixed),
            HeaderType::Uint => RawEvent::Mode(u32::from_ne_bytes([
                fixed[0], fixed[1], fixed[2], fixed[3],
            ])),
            HeaderType::Freq => match IwFreq::from_bytes(fixed) {
                Some(freq) => RawEvent::Frequency(freq),
                None => return Step::Skip,
            },
            HeaderType::Addr => {
                let mut addr = [0u8; 6];
                addr.copy_from_slice(&fixed[2..8]);
                RawEvent::Address(addr)
            }
            HeaderType::Param => RawEvent::Bitrate(i32::from_ne_bytes([
                fixed[0], fixed[1], fixed[2], fixed[3],
            ])),
            HeaderType::Qual => match IwQuality::from_bytes(fixed) {
                Some(qual) => RawEvent::Quality(qual),
                None => return Step::Skip,
            },
            HeaderType::Point { .. } => return Step::Skip,
        };
        Step::Event(event)
    }

    fn advance(&mut self, end: usize) {
        self.value = None;
        self.current = end;
    }
}

enum Step<'a> {
    Event(RawEvent<'a>),
    Skip,
    End,
    Malformed(&'static str),
}

impl<'a> Iterator for EventStream<'a> {
    type Item = RawEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.extract() {
            Extract::Event(event) => Some(event),
            Extract::End => None,
            Extract::Malformed { offset, reason } => {
                debug!("[SCAN] scan stream ends at offset {}: {}", offset, reason);
                None
            }
        }
    }
}
