//! SIGINT/SIGTERM bridge onto the shared [`CancelSignal`].

use std::io;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use agent_provider::CancelSignal;
use tracing::warn;

/// Exit status used when a session ends because of an interrupt.
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Keeps the signal thread alive; dropping it unregisters the handlers.
pub struct InterruptGuard {
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// The first signal sets `cancel` so the session can restore and exit;
/// a second one exits immediately.
#[cfg(unix)]
pub fn install(cancel: CancelSignal) -> io::Result<InterruptGuard> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();

    let thread = std::thread::Builder::new()
        .name("doc-agent-interrupt".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if cancel.swap(true, Ordering::SeqCst) {
                    warn!(signal, "second interrupt; exiting without cleanup");
                    std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
                }
                warn!(signal, "interrupt received; cancelling session");
            }
        })?;

    Ok(InterruptGuard {
        handle,
        thread: Some(thread),
    })
}

#[cfg(not(unix))]
pub fn install(_cancel: CancelSignal) -> io::Result<InterruptGuard> {
    Ok(InterruptGuard { thread: None })
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn sigint_sets_cancel_flag() {
        let cancel = Arc::new(AtomicBool::new(false));
        let _guard = install(Arc::clone(&cancel)).expect("install handler");

        signal_hook::low_level::raise(signal_hook::consts::SIGINT).expect("raise");

        let deadline = Instant::now() + Duration::from_secs(2);
        while !cancel.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(cancel.load(Ordering::SeqCst));
    }
}
