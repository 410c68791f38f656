use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, trace};
use rand::{distributions::Alphanumeric, Rng};

use crate::error::{CtrlError, Result};
use crate::status::WpaStatus;

/// Directories wpa_supplicant creates its control sockets in.
pub const CONTROL_DIRS: [&str; 2] = ["/run/wpa_supplicant", "/var/run/wpa_supplicant"];

/// Upper bound on `BSS <n>` queries issued by [`ControlConnection::list_scan_results`].
pub const MAX_BSS_INDEX: usize = 1000;

// sizeof(sockaddr_un.sun_path)
const SUN_PATH_LEN: usize = 108;

/// Timeouts and buffer sizes for a [`ControlConnection`].
#[derive(Debug, Clone)]
pub struct CtrlConfig {
    /// Time to wait for the reply to one request.
    pub request_timeout: Duration,
    /// Largest reply accepted for a request.
    pub reply_buffer: usize,
    /// Largest unsolicited message accepted by `recv`.
    pub event_buffer: usize,
}

impl Default for CtrlConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            reply_buffer: 2048,
            event_buffer: 256,
        }
    }
}

struct LocalSocketCleanup {
    path: PathBuf,
}

impl Drop for LocalSocketCleanup {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn build_local_socket_path(target: &Path) -> PathBuf {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let name: String = target
        .file_name()
        .map(|n| n.to_string_lossy().chars().take(16).collect())
        .unwrap_or_default();
    let filename = format!("wlprobe_ctrl_{}_{}", name, suffix);
    std::env::temp_dir().join(filename)
}

/// Socket path for `interface` inside a control directory.
pub fn control_socket_path(dir: impl AsRef<Path>, interface: &str) -> PathBuf {
    dir.as_ref().join(interface)
}

pub fn control_socket_candidates(interface: &str) -> Vec<PathBuf> {
    CONTROL_DIRS
        .iter()
        .map(|dir| control_socket_path(dir, interface))
        .collect()
}

/// First existing control socket for `interface`.
pub fn find_control_socket(interface: &str) -> Option<PathBuf> {
    control_socket_candidates(interface)
        .into_iter()
        .find(|path| path.exists())
}

struct Channel {
    socket: UnixDatagram,
    _cleanup: LocalSocketCleanup,
}

/// Unsolicited messages carry a `<level>` prefix, or `IFNAME=` on global
/// control sockets.
fn is_unsolicited(reply: &[u8]) -> bool {
    reply.first() == Some(&b'<') || reply.starts_with(b"IFNAME=")
}

fn is_ok(reply: &str) -> bool {
    reply.trim_end() == "OK"
}

/// Readability from a `poll` result. Error bits without `POLLIN` are a
/// broken socket, not an empty one.
fn poll_readable(revents: libc::c_short) -> io::Result<bool> {
    if revents & libc::POLLIN != 0 {
        return Ok(true);
    }
    if revents & libc::POLLNVAL != 0 {
        return Err(io::Error::from_raw_os_error(libc::EBADF));
    }
    if revents & (libc::POLLERR | libc::POLLHUP) != 0 {
        return Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            format!("poll reported revents {:#x}", revents),
        ));
    }
    Ok(false)
}

/// One connection to a wpa_supplicant (or hostapd) control socket.
///
/// Requests and unsolicited events share the socket. While attached, events
/// arriving during a request are dropped; use a second connection to monitor
/// events and issue requests at the same time.
pub struct ControlConnection {
    path: PathBuf,
    attached: bool,
    config: CtrlConfig,
    channel: Option<Channel>,
}

impl ControlConnection {
    /// Connect with default timeouts.
    ///
    /// # Errors
    /// `Connect` if the path is unusable or nothing listens on it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, CtrlConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: CtrlConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let connect_err = |reason: String| CtrlError::Connect {
            path: path.display().to_string(),
            reason,
        };

        let len = path.as_os_str().len();
        if len == 0 {
            return Err(connect_err("empty path".to_string()));
        }
        if len >= SUN_PATH_LEN {
            return Err(connect_err(format!(
                "path length {} exceeds socket address limit",
                len
            )));
        }

        let local_path = build_local_socket_path(&path);
        if local_path.exists() {
            let _ = fs::remove_file(&local_path);
        }
        let socket = UnixDatagram::bind(&local_path).map_err(|e| {
            connect_err(format!(
                "failed to bind local socket {}: {}",
                local_path.display(),
                e
            ))
        })?;
        let cleanup = LocalSocketCleanup { path: local_path };

        socket.connect(&path).map_err(|e| connect_err(e.to_string()))?;

        debug!("[CTRL] connected to {}", path.display());
        Ok(Self {
            path,
            attached: false,
            config,
            channel: Some(Channel {
                socket,
                _cleanup: cleanup,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    pub fn config(&self) -> &CtrlConfig {
        &self.config
    }

    fn socket(&self, operation: &str) -> Result<&UnixDatagram> {
        self.channel.as_ref().map(|c| &c.socket).ok_or_else(|| {
            CtrlError::io_error(
                operation,
                io::Error::new(io::ErrorKind::NotConnected, "connection closed"),
            )
        })
    }

    /// Send `command` and wait for its reply.
    ///
    /// The reply is returned verbatim, including any trailing newline.
    /// `FAIL` replies are returned as text, not as errors.
    ///
    /// # Errors
    /// * `RequestTimeout` - no reply within the configured timeout
    /// * `RequestFailed` - the socket send or receive failed
    pub fn request(&self, command: &str) -> Result<String> {
        let failed = |e: io::Error| CtrlError::RequestFailed {
            command: command.to_string(),
            reason: e.to_string(),
        };
        let timeout = || CtrlError::RequestTimeout {
            command: command.to_string(),
            timeout_ms: self.config.request_timeout.as_millis() as u64,
        };

        let socket = self.socket("sending request")?;
        trace!("[CTRL] -> {}", command);
        socket.send(command.as_bytes()).map_err(failed)?;

        let deadline = Instant::now() + self.config.request_timeout;
        let mut buf = vec![0u8; self.config.reply_buffer.max(1)];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timeout());
            }
            socket.set_read_timeout(Some(remaining)).map_err(failed)?;

            match socket.recv(&mut buf) {
                Ok(n) if is_unsolicited(&buf[..n]) => {
                    trace!(
                        "[CTRL] dropping event during '{}': {}",
                        command,
                        String::from_utf8_lossy(&buf[..n]).trim_end()
                    );
                }
                Ok(n) => return Ok(String::from_utf8_lossy(&buf[..n]).into_owned()),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(timeout())
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(failed(e)),
            }
        }
    }

    /// Register for unsolicited event messages. No-op when already attached.
    pub fn attach(&mut self) -> Result<()> {
        if self.attached {
            return Ok(());
        }
        self.expect_ok("ATTACH")?;
        self.attached = true;
        info!("[CTRL] attached to {}", self.path.display());
        Ok(())
    }

    /// Stop receiving event messages. No-op when not attached.
    pub fn detach(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.expect_ok("DETACH")?;
        self.attached = false;
        info!("[CTRL] detached from {}", self.path.display());
        Ok(())
    }

    fn expect_ok(&self, command: &str) -> Result<()> {
        let reply = self.request(command)?;
        if is_ok(&reply) {
            Ok(())
        } else {
            Err(CtrlError::Protocol {
                command: command.to_string(),
                response: reply.trim_end().to_string(),
            })
        }
    }

    /// Whether a message is waiting to be received. Never blocks.
    pub fn pending(&self) -> Result<bool> {
        let socket = self.socket("polling control socket")?;
        let mut pfd = libc::pollfd {
            fd: socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ret = unsafe { libc::poll(&mut pfd, 1, 0) };
        if ret < 0 {
            return Err(CtrlError::io_error(
                "polling control socket",
                io::Error::last_os_error(),
            ));
        }
        if ret == 0 {
            return Ok(false);
        }
        poll_readable(pfd.revents).map_err(|e| CtrlError::io_error("polling control socket", e))
    }

    /// Block until one message arrives.
    pub fn recv(&self) -> Result<String> {
        let socket = self.socket("receiving event")?;
        socket
            .set_read_timeout(None)
            .map_err(|e| CtrlError::io_error("receiving event", e))?;
        let mut buf = vec![0u8; self.config.event_buffer.max(1)];
        loop {
            match socket.recv(&mut buf) {
                Ok(n) => return Ok(String::from_utf8_lossy(&buf[..n]).into_owned()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(CtrlError::io_error("receiving event", e)),
            }
        }
    }

    /// Wait up to `timeout` for one message. `Ok(None)` when none arrived.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<String>> {
        if timeout.is_zero() {
            return if self.pending()? {
                self.recv().map(Some)
            } else {
                Ok(None)
            };
        }

        let socket = self.socket("receiving event")?;
        socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| CtrlError::io_error("receiving event", e))?;
        let mut buf = vec![0u8; self.config.event_buffer.max(1)];
        match socket.recv(&mut buf) {
            Ok(n) => Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned())),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(CtrlError::io_error("receiving event", e)),
        }
    }

    /// Raw `BSS <n>` replies for every scan result the daemon holds.
    ///
    /// Queries indices upward from 0 and stops at the first reply without a
    /// `bssid=` line, or after [`MAX_BSS_INDEX`] queries.
    pub fn list_scan_results(&self) -> Result<Vec<String>> {
        let mut results = Vec::new();
        for index in 0..MAX_BSS_INDEX {
            let reply = self.request(&format!("BSS {}", index))?;
            if !reply.contains("bssid=") {
                break;
            }
            results.push(reply);
        }
        debug!(
            "[CTRL] {} scan result(s) from {}",
            results.len(),
            self.path.display()
        );
        Ok(results)
    }

    /// `PING` must be answered with `PONG`.
    pub fn ping(&self) -> Result<()> {
        let reply = self.request("PING")?;
        if reply.trim() == "PONG" {
            Ok(())
        } else {
            Err(CtrlError::Protocol {
                command: "PING".to_string(),
                response: reply.trim_end().to_string(),
            })
        }
    }

    pub fn status(&self) -> Result<WpaStatus> {
        let reply = self.request("STATUS")?;
        Ok(WpaStatus::parse(&reply))
    }

    /// Detach if attached (errors ignored) and release the socket.
    /// Calling it again does nothing.
    pub fn close(&mut self) {
        if self.channel.is_none() {
            return;
        }
        if self.attached {
            if let Err(e) = self.detach() {
                debug!("[CTRL] detach on close failed: {}", e);
            }
            self.attached = false;
        }
        self.channel = None;
        debug!("[CTRL] closed {}", self.path.display());
    }
}

impl Drop for ControlConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::os::unix::net::UnixDatagram;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use tempfile::TempDir;

    /// Datagram daemon answering requests through a handler. Each request
    /// produces zero or more datagrams back to the sender.
    pub(crate) struct FakeDaemon {
        pub path: PathBuf,
        pub requests: Arc<Mutex<Vec<String>>>,
        _dir: TempDir,
    }

    pub(crate) fn spawn<F>(mut handler: F) -> FakeDaemon
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wlan0");
        let socket = UnixDatagram::bind(&path).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            while let Ok((n, peer)) = socket.recv_from(&mut buf) {
                let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                seen.lock().unwrap().push(request.clone());
                let Some(peer) = peer.as_pathname().map(|p| p.to_path_buf()) else {
                    continue;
                };
                for reply in handler(&request) {
                    let _ = socket.send_to(reply.as_bytes(), &peer);
                }
            }
        });

        FakeDaemon {
            path,
            requests,
            _dir: dir,
        }
    }

    /// Replies like wpa_supplicant for the commands the tests use.
    pub(crate) fn supplicant(bss_count: usize) -> impl FnMut(&str) -> Vec<String> + Send {
        move |request: &str| {
            let reply = match request {
                "PING" => "PONG\n".to_string(),
                "ATTACH" | "DETACH" | "SCAN" => "OK\n".to_string(),
                "STATUS" => "bssid=00:11:22:33:44:55\nssid=home\nwpa_state=COMPLETED\n".to_string(),
                other => match other.strip_prefix("BSS ").and_then(|i| i.parse::<usize>().ok()) {
                    Some(i) if i < bss_count => format!(
                        "id={}\nbssid=00:11:22:33:44:{:02x}\nfreq=2412\nlevel=-40\nssid=net{}\n",
                        i, i, i
                    ),
                    Some(_) => String::new(),
                    None => "UNKNOWN COMMAND\n".to_string(),
                },
            };
            vec![reply]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{spawn, supplicant};
    use super::*;

    fn quick() -> CtrlConfig {
        CtrlConfig {
            request_timeout: Duration::from_millis(300),
            ..Default::default()
        }
    }

    #[test]
    fn request_returns_reply_verbatim() {
        let daemon = spawn(supplicant(0));
        let conn = ControlConnection::open(&daemon.path).unwrap();
        assert_eq!(conn.request("PING").unwrap(), "PONG\n");
        assert_eq!(conn.request("FOO").unwrap(), "UNKNOWN COMMAND\n");
        conn.ping().unwrap();
    }

    #[test]
    fn attach_and_detach_are_idempotent() {
        let daemon = spawn(supplicant(0));
        let mut conn = ControlConnection::open(&daemon.path).unwrap();

        conn.detach().unwrap();
        assert!(!conn.is_attached());

        conn.attach().unwrap();
        conn.attach().unwrap();
        assert!(conn.is_attached());

        conn.detach().unwrap();
        assert!(!conn.is_attached());

        let sent = daemon.requests.lock().unwrap().clone();
        assert_eq!(sent, vec!["ATTACH", "DETACH"]);
    }

    #[test]
    fn rejected_attach_is_protocol_error() {
        let daemon = spawn(|_: &str| vec!["FAIL\n".to_string()]);
        let mut conn = ControlConnection::open(&daemon.path).unwrap();
        assert!(matches!(conn.attach(), Err(CtrlError::Protocol { .. })));
        assert!(!conn.is_attached());
    }

    #[test]
    fn silent_daemon_times_out() {
        let daemon = spawn(|_: &str| Vec::new());
        let conn = ControlConnection::open_with_config(&daemon.path, quick()).unwrap();
        let err = conn.request("PING").unwrap_err();
        assert!(err.is_timeout(), "unexpected {:?}", err);
        assert!(matches!(err, CtrlError::RequestTimeout { timeout_ms: 300, .. }));
    }

    #[test]
    fn vanished_daemon_fails_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wlan0");
        let server = UnixDatagram::bind(&path).unwrap();
        let conn = ControlConnection::open_with_config(&path, quick()).unwrap();

        drop(server);
        fs::remove_file(&path).unwrap();

        let err = conn.request("PING").unwrap_err();
        assert!(!err.is_timeout(), "unexpected {:?}", err);
        assert!(matches!(err, CtrlError::RequestFailed { ref command, .. } if command == "PING"));
    }

    #[test]
    fn poll_error_bits_are_errors() {
        assert!(poll_readable(libc::POLLIN).unwrap());
        assert!(poll_readable(libc::POLLIN | libc::POLLHUP).unwrap());
        assert!(!poll_readable(0).unwrap());
        assert!(poll_readable(libc::POLLHUP).is_err());
        assert!(poll_readable(libc::POLLERR).is_err());
        assert!(poll_readable(libc::POLLNVAL).is_err());
    }

    #[test]
    fn ok_reply_forms() {
        assert!(is_ok("OK\n"));
        assert!(is_ok("OK"));
        assert!(!is_ok("FAIL\n"));
        assert!(!is_ok("OK-ish\n"));
    }

    #[test]
    fn unsolicited_messages_are_skipped() {
        let daemon = spawn(|_: &str| {
            vec![
                "<3>CTRL-EVENT-SCAN-STARTED ".to_string(),
                "IFNAME=wlan0 <3>CTRL-EVENT-SCAN-RESULTS ".to_string(),
                "PONG\n".to_string(),
            ]
        });
        let conn = ControlConnection::open_with_config(&daemon.path, quick()).unwrap();
        assert_eq!(conn.request("PING").unwrap(), "PONG\n");
    }

    #[test]
    fn scan_results_stop_at_first_non_bss_reply() {
        let daemon = spawn(supplicant(5));
        let conn = ControlConnection::open(&daemon.path).unwrap();
        let results = conn.list_scan_results().unwrap();
        assert_eq!(results.len(), 5);
        assert!(results[4].contains("bssid=00:11:22:33:44:04"));
        assert_eq!(daemon.requests.lock().unwrap().len(), 6);
    }

    #[test]
    fn scan_results_propagate_timeouts() {
        let daemon = spawn(|request: &str| {
            if request == "BSS 0" {
                vec!["bssid=00:00:00:00:00:01\n".to_string()]
            } else {
                Vec::new()
            }
        });
        let conn = ControlConnection::open_with_config(&daemon.path, quick()).unwrap();
        assert!(conn.list_scan_results().unwrap_err().is_timeout());
    }

    #[test]
    fn open_rejects_bad_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nobody-home");
        assert!(matches!(
            ControlConnection::open(&missing),
            Err(CtrlError::Connect { .. })
        ));

        let long = format!("/tmp/{}", "x".repeat(200));
        assert!(matches!(
            ControlConnection::open(&long),
            Err(CtrlError::Connect { .. })
        ));
        assert!(matches!(
            ControlConnection::open(""),
            Err(CtrlError::Connect { .. })
        ));
    }

    #[test]
    fn pending_and_recv_events() {
        let daemon = spawn(|request: &str| match request {
            "ATTACH" => vec![
                "OK\n".to_string(),
                "<2>CTRL-EVENT-CONNECTED - Connection to 00:11:22:33:44:55 completed".to_string(),
            ],
            _ => vec!["OK\n".to_string()],
        });
        let mut conn = ControlConnection::open(&daemon.path).unwrap();
        assert!(!conn.pending().unwrap());

        conn.attach().unwrap();
        let mut waited = 0;
        while !conn.pending().unwrap() && waited < 100 {
            std::thread::sleep(Duration::from_millis(10));
            waited += 1;
        }
        assert!(conn.pending().unwrap());
        let event = conn.recv().unwrap();
        assert!(event.starts_with("<2>CTRL-EVENT-CONNECTED"));
        assert!(!conn.pending().unwrap());
        assert_eq!(conn.recv_timeout(Duration::from_millis(20)).unwrap(), None);
    }

    #[test]
    fn close_detaches_and_is_idempotent() {
        let daemon = spawn(supplicant(0));
        let mut conn = ControlConnection::open(&daemon.path).unwrap();
        conn.attach().unwrap();
        conn.close();
        conn.close();
        assert!(!conn.is_attached());
        assert!(!conn.is_open());
        assert!(conn.request("PING").is_err());
        assert_eq!(
            *daemon.requests.lock().unwrap(),
            vec!["ATTACH".to_string(), "DETACH".to_string()]
        );
    }

    #[test]
    fn local_socket_is_removed_on_drop() {
        let daemon = spawn(supplicant(0));
        let conn = ControlConnection::open(&daemon.path).unwrap();
        let local = conn.channel.as_ref().unwrap()._cleanup.path.clone();
        assert!(local.exists());
        drop(conn);
        assert!(!local.exists());
    }

    #[test]
    fn status_is_parsed() {
        let daemon = spawn(supplicant(0));
        let conn = ControlConnection::open(&daemon.path).unwrap();
        let status = conn.status().unwrap();
        assert_eq!(status.ssid.as_deref(), Some("home"));
        assert_eq!(status.wpa_state, crate::status::WpaState::Completed);
    }

    #[test]
    fn socket_candidates() {
        assert_eq!(
            control_socket_candidates("wlan0"),
            vec![
                PathBuf::from("/run/wpa_supplicant/wlan0"),
                PathBuf::from("/var/run/wpa_supplicant/wlan0")
            ]
        );
        assert_eq!(
            control_socket_path("/tmp/ctrl", "wlp2s0"),
            PathBuf::from("/tmp/ctrl/wlp2s0")
        );
    }
}
