//! Scan orchestration: trigger, bounded retrieval loop, record assembly.
//!
//! The loop talks to the driver through [`ScanDevice`] so it can run against
//! the real ioctl backend or a scripted device in tests.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Result, WextError};
use crate::range::RangeInfo;
use crate::record::{assemble_records, AccessPointRecord};

/// Wireless-extensions version assumed when the driver range is unavailable.
pub const DEFAULT_WE_VERSION: u8 = 22;

/// Initial scan buffer size (`IW_SCAN_MAX_DATA`).
pub const IW_SCAN_MAX_DATA: usize = 4096;

/// Largest buffer the 16-bit `iw_point.length` can describe.
pub const IW_SCAN_BUFFER_LIMIT: usize = 0xFFFF;

/// Outcome of one attempt to read scan results.
#[derive(Debug)]
pub enum ScanRead {
    /// `n` bytes of event data were written to the buffer.
    Complete(usize),
    /// The buffer was too small. `required` is the size the driver reported,
    /// or the current size when it reported nothing useful.
    BufferTooSmall { required: usize },
    /// Results are not ready yet.
    TryAgain,
    Failed(io::Error),
}

/// Driver operations needed to run a scan.
pub trait ScanDevice {
    fn interface(&self) -> &str;

    /// Driver capability descriptor (`SIOCGIWRANGE`).
    fn range_info(&self) -> Result<RangeInfo>;

    /// Ask the driver to start a scan (`SIOCSIWSCAN`).
    fn trigger_scan(&self) -> io::Result<()>;

    /// Read collected results into `buf` (`SIOCGIWSCAN`).
    fn read_scan(&self, buf: &mut [u8]) -> ScanRead;
}

/// Timing and buffer limits for [`Scanner`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Wait after a successful trigger before the first read.
    pub initial_wait: Duration,
    /// Wait between reads while the driver reports results are not ready.
    pub retry_wait: Duration,
    /// Total time allowed for waiting on results, including the initial wait.
    pub budget: Duration,
    pub initial_buffer: usize,
    pub max_buffer: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_millis(250),
            retry_wait: Duration::from_millis(100),
            budget: Duration::from_micros(15_000_000),
            initial_buffer: IW_SCAN_MAX_DATA,
            max_buffer: IW_SCAN_BUFFER_LIMIT,
        }
    }
}

/// Runs scans on a [`ScanDevice`].
pub struct Scanner<D> {
    device: D,
    config: ScanConfig,
}

impl<D: ScanDevice> Scanner<D> {
    /// Create a scanner with default timing.
    pub fn new(device: D) -> Self {
        Self::with_config(device, ScanConfig::default())
    }

    pub fn with_config(device: D, config: ScanConfig) -> Self {
        Self { device, config }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Trigger a scan and collect the results.
    ///
    /// A trigger refused with `EPERM` is not fatal: results cached by the
    /// driver from an earlier scan are still read, without the initial wait.
    /// Any other trigger failure is returned as `ScanUnsupported`.
    pub fn scan(&self) -> Result<Vec<AccessPointRecord>> {
        let interface = self.device.interface();
        let started = Instant::now();

        let range = match self.device.range_info() {
            Ok(range) => Some(range),
            Err(e) => {
                debug!("[SCAN] {}: no range info, using raw values: {}", interface, e);
                None
            }
        };
        let we_version = range
            .as_ref()
            .map(|r| r.we_version_compiled)
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_WE_VERSION);

        let mut wait = match self.device.trigger_scan() {
            Ok(()) => self.config.initial_wait,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!(
                    "[SCAN] {}: scan trigger not permitted, reading cached results",
                    interface
                );
                Duration::ZERO
            }
            Err(e) => {
                return Err(WextError::ScanUnsupported {
                    interface: interface.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let mut remaining = self.config.budget.saturating_sub(wait);
        let mut buf = vec![0u8; self.config.initial_buffer.max(1)];

        loop {
            if !wait.is_zero() {
                thread::sleep(wait);
            }

            match self.device.read_scan(&mut buf) {
                ScanRead::Complete(0) => {
                    info!("[SCAN] {}: no scan results", interface);
                    return Ok(Vec::new());
                }
                ScanRead::Complete(len) => {
                    let len = len.min(buf.len());
                    let records = assemble_records(&buf[..len], we_version, range.as_ref());
                    info!(
                        "[SCAN] {}: {} cell(s) from {} bytes in {:?}",
                        interface,
                        records.len(),
                        len,
                        started.elapsed()
                    );
                    return Ok(records);
                }
                ScanRead::BufferTooSmall { required } => {
                    let next = grow_size(buf.len(), required, self.config.max_buffer).ok_or_else(
                        || WextError::ScanBufferLimit {
                            interface: interface.to_string(),
                            required: required.max(buf.len() + 1),
                            limit: self.config.max_buffer,
                        },
                    )?;
                    debug!(
                        "[SCAN] {}: buffer {} too small, growing to {}",
                        interface,
                        buf.len(),
                        next
                    );
                    buf.resize(next, 0);
                    wait = Duration::ZERO;
                }
                ScanRead::TryAgain => {
                    remaining = remaining.saturating_sub(self.config.retry_wait);
                    if remaining.is_zero() {
                        return Err(WextError::ScanTimeout {
                            interface: interface.to_string(),
                            budget_ms: self.config.budget.as_millis() as u64,
                        });
                    }
                    wait = self.config.retry_wait;
                }
                ScanRead::Failed(e) => {
                    return Err(WextError::ScanRead {
                        interface: interface.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        }
    }
}

/// Next buffer size after a "too small" report: the reported size when it is
/// larger than the current buffer, else double. `None` once `limit` is hit.
fn grow_size(current: usize, required: usize, limit: usize) -> Option<usize> {
    if current >= limit || required > limit {
        return None;
    }
    let next = if required > current {
        required
    } else {
        current.saturating_mul(2)
    };
    Some(next.min(limit))
}
