//! # wlprobe-wext
//!
//! Wireless-extensions scanning without `iwlist`: triggers a scan through
//! ioctls, reads the raw event stream and decodes it into per-cell records.
//!
//! ## Features
//!
//! - **Event stream reader**: bounds-checked walk over `SIOCGIWSCAN` buffers
//! - **Field decoding**: iwlist-compatible formatting of frequency, bitrate and link stats
//! - **WPA/RSN elements**: cipher and key-management suites from beacon IEs
//! - **Scan orchestration**: bounded retry loop with a growable receive buffer
//! - **Device discovery**: `/proc/net/wireless` plus a `SIOCGIWNAME` probe
//!
//! ## Platform Support
//!
//! Decoding is portable. The ioctl backend and device discovery are gated with
//! `#[cfg(target_os = "linux")]`.
//!
//! ## Usage
//!
//! ```no_run
//! use wlprobe_wext::{Scanner, WextDevice};
//!
//! fn main() -> wlprobe_wext::Result<()> {
//!     let device = WextDevice::open("wlan0")?;
//!     for cell in Scanner::new(device).scan()? {
//!         println!("{:?} {:?}", cell.bssid, cell.essid);
//!     }
//!     Ok(())
//! }
//! ```

pub mod decode;
#[cfg(target_os = "linux")]
pub mod devices;
pub mod error;
pub mod format;
pub mod ie;
#[cfg(target_os = "linux")]
pub mod ioctl;
pub mod logging;
pub mod range;
pub mod record;
pub mod scan;
pub mod stream;
pub mod summary;

pub use decode::{decode_event, DecodedField};
#[cfg(target_os = "linux")]
pub use devices::enumerate_devices;
pub use error::{Result, WextError};
pub use ie::{decode_elements, decode_ie, Cipher, IeType, KeyMgmt, WpaInfo};
#[cfg(target_os = "linux")]
pub use ioctl::WextDevice;
pub use range::RangeInfo;
pub use record::{assemble_records, AccessPointRecord};
pub use scan::{ScanConfig, ScanDevice, ScanRead, Scanner};
pub use stream::{EventStream, Extract, RawEvent};
pub use summary::{EncryptionMethod, NetworkSummary};
