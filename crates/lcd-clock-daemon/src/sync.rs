//! Clock synchronisation status from the kernel's NTP discipline.

use tracing::{info, warn};

/// `adjtimex` state meaning the clock is not synchronised.
#[cfg(target_os = "linux")]
const TIME_ERROR: libc::c_int = 5;

/// Asks the kernel whether the system clock is synchronised.
#[cfg(target_os = "linux")]
pub fn clock_synchronized() -> bool {
    let mut timex: libc::timex = unsafe { std::mem::zeroed() };

    // SAFETY: modes is zero, so this only reads; the pointer is valid
    let state = unsafe { libc::adjtimex(&mut timex) };

    if state < 0 {
        warn!("adjtimex failed: {}", std::io::Error::last_os_error());
        return false;
    }
    state != TIME_ERROR
}

#[cfg(not(target_os = "linux"))]
pub fn clock_synchronized() -> bool {
    true
}

/// Polls the synchronisation status once a minute.
pub struct SyncMonitor {
    enabled: bool,
    synchronized: bool,
    check: fn() -> bool,
}

impl SyncMonitor {
    /// A disabled monitor always reports synchronised.
    pub fn new(enabled: bool) -> Self {
        Self::with_check(enabled, clock_synchronized)
    }

    fn with_check(enabled: bool, check: fn() -> bool) -> Self {
        Self {
            enabled,
            synchronized: !enabled || check(),
            check,
        }
    }

    /// Re-checks at the top of each minute and returns the current status.
    pub fn poll(&mut self, second: u8) -> bool {
        if self.enabled && second == 0 {
            let synchronized = (self.check)();
            if synchronized != self.synchronized {
                info!(
                    "Clock {}",
                    if synchronized {
                        "synchronised"
                    } else {
                        "lost synchronisation"
                    }
                );
            }
            self.synchronized = synchronized;
        }
        self.synchronized
    }
}
