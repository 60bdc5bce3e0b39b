// src/video/error_guard.rs

//! Scoped interception of X protocol errors.
//!
//! Xlib reports protocol errors asynchronously through a process-wide
//! handler whose default action exits the process. Requests that may fail
//! on some servers are wrapped in an `ErrorGuard`, which swaps in a trapping
//! handler for its lifetime:
//!
//! ```ignore
//! let guard = ErrorGuard::new(server);
//! let screens = server.xinerama_screens();
//! if guard.finish() {
//!     // the request raised an error, ignore its reply
//! }
//! ```

use log::trace;
use std::cell::Cell;

use crate::server::XServer;

thread_local! {
    static GUARD_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

pub struct ErrorGuard<'a, S: XServer> {
    server: &'a S,
    previous: Option<S::ErrorHandler>,
}

impl<'a, S: XServer> ErrorGuard<'a, S> {
    /// Flushes pending requests so earlier errors are not attributed to the
    /// guarded ones, then installs the trap.
    pub fn new(server: &'a S) -> Self {
        debug_assert!(
            !GUARD_ACTIVE.with(Cell::get),
            "ErrorGuard does not nest"
        );
        GUARD_ACTIVE.with(|active| active.set(true));
        server.sync();
        let previous = server.install_error_trap();
        trace!("X error trap installed");
        Self {
            server,
            previous: Some(previous),
        }
    }

    /// Waits for all guarded requests to be processed and reports whether
    /// any of them raised an error. The previous handler is restored.
    pub fn finish(self) -> bool {
        self.server.sync();
        self.server.trapped_error()
    }
}

impl<S: XServer> Drop for ErrorGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.server.restore_error_handler(previous);
            trace!("X error handler restored");
        }
        GUARD_ACTIVE.with(|active| active.set(false));
    }
}
