use std::env;
use std::path::PathBuf;
use std::time::Duration;

use wlprobe_ctrl::{CtrlConfig, CONTROL_DIRS};
use wlprobe_wext::ScanConfig;

pub const DEFAULT_SCAN_INITIAL_WAIT_MS: u64 = 250;
pub const DEFAULT_SCAN_BUDGET_MS: u64 = 15_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub scan_initial_wait: Duration,
    pub scan_budget: Duration,
    pub request_timeout: Duration,
    /// Directory holding per-interface control sockets.
    pub ctrl_dir: Option<PathBuf>,
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str, default: u64| {
            Duration::from_millis(
                lookup(key)
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(default),
            )
        };

        Self {
            scan_initial_wait: millis("WLPROBE_SCAN_INITIAL_WAIT_MS", DEFAULT_SCAN_INITIAL_WAIT_MS),
            scan_budget: millis("WLPROBE_SCAN_BUDGET_MS", DEFAULT_SCAN_BUDGET_MS),
            request_timeout: millis("WLPROBE_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS),
            ctrl_dir: lookup("WLPROBE_CTRL_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn scan_config(&self, no_trigger_wait: bool) -> ScanConfig {
        ScanConfig {
            initial_wait: if no_trigger_wait {
                Duration::ZERO
            } else {
                self.scan_initial_wait
            },
            budget: self.scan_budget,
            ..ScanConfig::default()
        }
    }

    pub fn ctrl_config(&self, timeout_ms: Option<u64>) -> CtrlConfig {
        CtrlConfig {
            request_timeout: timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(self.request_timeout),
            ..CtrlConfig::default()
        }
    }

    /// Resolve a control socket argument. Anything containing `/` is a path;
    /// a bare name is an interface looked up under the control directory.
    pub fn resolve_socket(&self, target: &str) -> PathBuf {
        if target.contains('/') {
            return PathBuf::from(target);
        }
        if let Some(dir) = &self.ctrl_dir {
            return wlprobe_ctrl::control_socket_path(dir, target);
        }
        wlprobe_ctrl::find_control_socket(target)
            .unwrap_or_else(|| wlprobe_ctrl::control_socket_path(CONTROL_DIRS[0], target))
    }
}
