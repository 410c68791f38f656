//! Logging helpers.
//!
//! Provides an opt-in journald logger so the scanner and the control client can
//! forward their logs to `journalctl` without extra glue code.

#[cfg(feature = "journald")]
use systemd_journal_logger::JournalLog;

/// Initialize the journald logger once for the process.
///
/// Returns `true` when the logger was installed. Without the `journald` feature
/// this is a no-op returning `false`, so callers can fall back to another logger.
pub fn init_journald_logger() -> bool {
    #[cfg(feature = "journald")]
    {
        let installed = JournalLog::new().and_then(|l| {
            l.install()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        });
        match installed {
            Ok(()) => {
                log::set_max_level(log::LevelFilter::Info);
                log::debug!("[LOG] writing to the systemd journal");
                return true;
            }
            Err(e) => {
                eprintln!("journald unavailable ({}), logging to stderr", e);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    #[cfg(not(feature = "journald"))]
    #[test]
    fn falls_back_without_journald_feature() {
        assert!(!super::init_journald_logger());
    }
}
