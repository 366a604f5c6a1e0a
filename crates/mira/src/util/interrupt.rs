//! Cooperative cancellation.
//!
//! Long-running engines check a `CancelToken` between items and respond by
//! checkpointing and stopping; in-flight single-item operations complete.
//! The binary wires the token to SIGINT; the library never installs
//! handlers on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SIGINT_FLAG: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_sigint(_sig: libc::c_int) {
    SIGINT_FLAG.store(true, Ordering::SeqCst);
}

#[derive(Clone)]
enum Flag {
    Local(Arc<AtomicBool>),
    Sigint,
}

#[derive(Clone)]
pub struct CancelToken {
    flag: Flag,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Flag::Local(Arc::new(AtomicBool::new(false))),
        }
    }

    /// A token flipped by SIGINT. Installs the handler on first call.
    #[cfg(unix)]
    pub fn for_sigint() -> Self {
        let handler = on_sigint as extern "C" fn(libc::c_int);
        unsafe {
            libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        }
        Self { flag: Flag::Sigint }
    }

    #[cfg(not(unix))]
    pub fn for_sigint() -> Self {
        Self::new()
    }

    pub fn cancel(&self) {
        match &self.flag {
            Flag::Local(flag) => flag.store(true, Ordering::SeqCst),
            Flag::Sigint => SIGINT_FLAG.store(true, Ordering::SeqCst),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.flag {
            Flag::Local(flag) => flag.load(Ordering::SeqCst),
            Flag::Sigint => SIGINT_FLAG.load(Ordering::SeqCst),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
