//! # wlprobe-ctrl
//!
//! Client side of the wpa_supplicant control interface: one datagram socket
//! per connection, synchronous requests with a reply timeout, an event
//! monitor (attach/detach/pending/recv) and helpers built on top of it.
//!
//! ```no_run
//! use wlprobe_ctrl::{find_control_socket, ControlConnection};
//!
//! fn main() -> wlprobe_ctrl::Result<()> {
//!     if let Some(path) = find_control_socket("wlan0") {
//!         let conn = ControlConnection::open(path)?;
//!         for reply in conn.list_scan_results()? {
//!             print!("{}", reply);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod bss;
pub mod ctrl;
pub mod error;
pub mod status;

pub use bss::{parse_hex_bytes, BssInfo};
pub use ctrl::{
    control_socket_candidates, control_socket_path, find_control_socket, ControlConnection,
    CtrlConfig, CONTROL_DIRS, MAX_BSS_INDEX,
};
pub use error::{CtrlError, Result};
pub use status::{wait_for_authentication, AuthWaitConfig, WpaState, WpaStatus};
