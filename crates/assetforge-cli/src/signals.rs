//! Interrupt suppression while a build runs.
//!
//! Registering a tokio signal listener replaces the default SIGINT
//! disposition (terminate) for the rest of the process, so an interrupt can
//! no longer leave a half-written artifact behind. The listener is never
//! polled; interrupts are simply dropped.

use std::io;

use tokio::runtime::{Builder, Runtime};

#[cfg(unix)]
type Listener = tokio::signal::unix::Signal;

#[cfg(windows)]
type Listener = tokio::signal::windows::CtrlC;

#[cfg(not(any(unix, windows)))]
type Listener = ();

/// Holds the interrupt listener (and the runtime driving it) alive.
pub struct SigintGuard {
    _listener: Listener,
    _runtime: Runtime,
}

impl SigintGuard {
    pub fn install() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let listener = {
            let _context = runtime.enter();
            listen()?
        };
        Ok(SigintGuard {
            _listener: listener,
            _runtime: runtime,
        })
    }
}

#[cfg(unix)]
fn listen() -> io::Result<Listener> {
    use tokio::signal::unix::{signal, SignalKind};
    signal(SignalKind::interrupt())
}

#[cfg(windows)]
fn listen() -> io::Result<Listener> {
    tokio::signal::windows::ctrl_c()
}

#[cfg(not(any(unix, windows)))]
fn listen() -> io::Result<Listener> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interrupt suppression is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn guard_installs_and_can_be_reinstalled() {
        let first = SigintGuard::install().unwrap();
        drop(first);
        let _second = SigintGuard::install().unwrap();
    }
}
