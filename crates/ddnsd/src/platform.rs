// # Service manager integration
//
// - `Notifier`: sd_notify(3) readiness protocol over the `NOTIFY_SOCKET`
//   datagram socket. A no-op when the daemon is not started by systemd.
// - `PidFile`: written when running outside systemd, removed on drop.
//
// Failures here are logged and never stop the daemon.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable systemd sets for `Type=notify` services
const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Sends state changes to the service manager
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    socket: Option<OsString>,
}

impl Notifier {
    /// Notifier for the socket named by `NOTIFY_SOCKET`, if any
    pub fn from_env() -> Self {
        Self::new(std::env::var_os(NOTIFY_SOCKET_ENV))
    }

    pub fn new(socket: Option<OsString>) -> Self {
        Self {
            socket: socket.filter(|s| !s.is_empty()),
        }
    }

    /// Whether the daemon runs under systemd
    pub fn is_systemd(&self) -> bool {
        self.socket.is_some()
    }

    /// Startup finished, or a reload completed
    pub fn ready(&self) {
        self.notify("READY=1");
    }

    /// A configuration reload has started
    pub fn reloading(&self) {
        self.notify(&format!("RELOADING=1\nMONOTONIC_USEC={}", monotonic_usec()));
    }

    /// Shutdown has started
    pub fn stopping(&self) {
        self.notify("STOPPING=1");
    }

    fn notify(&self, state: &str) {
        let Some(socket) = &self.socket else {
            return;
        };

        match send(socket, state) {
            Ok(()) => debug!("Notified service manager: {}", state.replace('\n', " ")),
            Err(e) => warn!("Failed to notify service manager: {}", e),
        }
    }
}

#[cfg(unix)]
fn send(socket: &OsString, state: &str) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::net::UnixDatagram;

    let datagram = UnixDatagram::unbound()?;
    let bytes = socket.as_bytes();

    // Leading '@' names a Linux abstract socket
    if let Some(name) = bytes.strip_prefix(b"@") {
        #[cfg(target_os = "linux")]
        {
            use std::os::linux::net::SocketAddrExt;
            use std::os::unix::net::SocketAddr;

            let addr = SocketAddr::from_abstract_name(name)?;
            datagram.send_to_addr(state.as_bytes(), &addr)?;
            return Ok(());
        }

        #[cfg(not(target_os = "linux"))]
        {
            let _ = name;
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "abstract notify sockets are Linux-only",
            ));
        }
    }

    datagram.send_to(state.as_bytes(), Path::new(socket))?;
    Ok(())
}

#[cfg(not(unix))]
fn send(_socket: &OsString, _state: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "service notification requires Unix sockets",
    ))
}

/// Current CLOCK_MONOTONIC reading in microseconds
#[cfg(unix)]
fn monotonic_usec() -> u64 {
    // SAFETY: timespec is plain data; all-zero is a valid value
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };

    // SAFETY: `ts` is a valid, writable timespec
    if unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) } != 0 {
        return 0;
    }

    (ts.tv_sec as u64) * 1_000_000 + (ts.tv_nsec as u64) / 1_000
}

#[cfg(not(unix))]
fn monotonic_usec() -> u64 {
    0
}

/// PID file removed when dropped
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current process ID to `path`
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        fs::write(&path, format!("{}\n", std::process::id()))?;
        info!("Wrote PID file {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed PID file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove PID file {}: {}", self.path.display(), e),
        }
    }
}
