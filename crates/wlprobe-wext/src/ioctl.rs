//! Wireless-extensions ioctl backend (no external binaries).

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use log::{debug, warn};

use crate::error::{Result, WextError};
use crate::range::{RangeInfo, RANGE_BUFFER_LEN};
use crate::scan::{ScanDevice, ScanRead, IW_SCAN_BUFFER_LIMIT};
use crate::stream::SIOCGIWNAME;

const SIOCGIWRANGE: libc::c_ulong = 0x8B0B;
const SIOCSIWSCAN: libc::c_ulong = 0x8B18;
const SIOCGIWSCAN: libc::c_ulong = 0x8B19;

#[repr(C)]
#[derive(Clone, Copy)]
struct IwPoint {
    pointer: *mut libc::c_void,
    length: u16,
    flags: u16,
}

#[repr(C)]
union IwReqData {
    name: [libc::c_char; libc::IFNAMSIZ],
    data: IwPoint,
    raw: [u8; 16],
}

#[repr(C)]
struct IwReq {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    u: IwReqData,
}

#[repr(C)]
struct IfReqFlags {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    ifr_flags: libc::c_short,
    _pad: [u8; 22],
}

fn validate_ifname(name: &str) -> Result<CString> {
    if name.trim().is_empty() {
        return Err(WextError::InvalidInput(
            "Interface name cannot be empty".to_string(),
        ));
    }
    if name.len() >= libc::IFNAMSIZ {
        return Err(WextError::InvalidInput(format!(
            "Interface name '{}' too long",
            name
        )));
    }
    CString::new(name)
        .map_err(|_| WextError::InvalidInput(format!("Interface name '{}' contains NUL", name)))
}

fn copy_name(dst: &mut [libc::c_char; libc::IFNAMSIZ], name: &CString) {
    for (d, s) in dst.iter_mut().zip(name.as_bytes().iter()) {
        *d = *s as libc::c_char;
    }
}

/// A wireless interface addressed through wireless-extensions ioctls.
#[derive(Debug)]
pub struct WextDevice {
    name: String,
    c_name: CString,
    protocol: String,
    fd: OwnedFd,
}

impl WextDevice {
    /// Open an ioctl socket and check that `interface` has wireless extensions.
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - no such interface
    /// * `NotWireless` - the interface rejected `SIOCGIWNAME`
    pub fn open(interface: &str) -> Result<Self> {
        let c_name = validate_ifname(interface)?;
        let raw = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, 0) };
        if raw < 0 {
            return Err(WextError::io_error(
                "opening ioctl socket",
                io::Error::last_os_error(),
            ));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut device = Self {
            name: interface.to_string(),
            c_name,
            protocol: String::new(),
            fd,
        };

        let mut req = device.request();
        if let Err(err) = device.ioctl(libc::c_ulong::from(SIOCGIWNAME), &mut req) {
            return Err(match err.raw_os_error() {
                Some(libc::ENODEV) | Some(libc::ENXIO) => WextError::InterfaceNotFound {
                    name: interface.to_string(),
                },
                _ => WextError::NotWireless {
                    name: interface.to_string(),
                    reason: err.to_string(),
                },
            });
        }

        let name = unsafe { req.u.name };
        let bytes: Vec<u8> = name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        device.protocol = String::from_utf8_lossy(&bytes).into_owned();
        debug!("[SCAN] opened {} ({})", device.name, device.protocol);
        Ok(device)
    }

    /// True when `interface` answers `SIOCGIWNAME`.
    pub fn probe(interface: &str) -> bool {
        Self::open(interface).is_ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol name reported by the driver, e.g. `IEEE 802.11`.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Set `IFF_UP | IFF_RUNNING` on the interface.
    pub fn bring_up(&self) -> Result<()> {
        let mut ifr = IfReqFlags {
            ifr_name: [0; libc::IFNAMSIZ],
            ifr_flags: 0,
            _pad: [0; 22],
        };
        copy_name(&mut ifr.ifr_name, &self.c_name);

        self.ioctl(libc::SIOCGIFFLAGS as libc::c_ulong, &mut ifr)
            .map_err(|e| WextError::io_error(format!("reading flags of {}", self.name), e))?;

        let wanted = (libc::IFF_UP | libc::IFF_RUNNING) as libc::c_short;
        if ifr.ifr_flags & wanted == wanted {
            return Ok(());
        }
        ifr.ifr_flags |= wanted;
        self.ioctl(libc::SIOCSIFFLAGS as libc::c_ulong, &mut ifr)
            .map_err(|e| WextError::io_error(format!("bringing up {}", self.name), e))?;
        debug!("[SCAN] {} is up", self.name);
        Ok(())
    }

    fn request(&self) -> IwReq {
        let mut req = IwReq {
            ifr_name: [0; libc::IFNAMSIZ],
            u: IwReqData { raw: [0; 16] },
        };
        copy_name(&mut req.ifr_name, &self.c_name);
        req
    }

    fn point_request(&self, buf: &mut [u8]) -> IwReq {
        let mut req = self.request();
        req.u.data = IwPoint {
            pointer: if buf.is_empty() {
                std::ptr::null_mut()
            } else {
                buf.as_mut_ptr() as *mut libc::c_void
            },
            length: buf.len().min(IW_SCAN_BUFFER_LIMIT) as u16,
            flags: 0,
        };
        req
    }

    fn ioctl<T>(&self, request: libc::c_ulong, arg: &mut T) -> io::Result<()> {
        let res = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                request as _,
                arg as *mut T as *mut libc::c_void,
            )
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl ScanDevice for WextDevice {
    fn interface(&self) -> &str {
        &self.name
    }

    fn range_info(&self) -> Result<RangeInfo> {
        let mut buf = vec![0u8; RANGE_BUFFER_LEN];
        let mut req = self.point_request(&mut buf);
        self.ioctl(SIOCGIWRANGE, &mut req)
            .map_err(|e| WextError::io_error(format!("reading range of {}", self.name), e))?;
        RangeInfo::from_bytes(&buf).ok_or_else(|| WextError::NotWireless {
            name: self.name.clone(),
            reason: "truncated range descriptor".to_string(),
        })
    }

    fn trigger_scan(&self) -> io::Result<()> {
        let mut req = self.point_request(&mut []);
        self.ioctl(SIOCSIWSCAN, &mut req)
    }

    fn read_scan(&self, buf: &mut [u8]) -> ScanRead {
        let mut req = self.point_request(buf);
        match self.ioctl(SIOCGIWSCAN, &mut req) {
            Ok(()) => ScanRead::Complete(usize::from(unsafe { req.u.data.length })),
            Err(err) => match err.raw_os_error() {
                Some(libc::E2BIG) => ScanRead::BufferTooSmall {
                    required: usize::from(unsafe { req.u.data.length }),
                },
                Some(libc::EAGAIN) => ScanRead::TryAgain,
                _ => {
                    warn!("[SCAN] {}: SIOCGIWSCAN failed: {}", self.name, err);
                    ScanRead::Failed(err)
                }
            },
        }
    }
}
