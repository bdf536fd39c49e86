use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use futures::{
    FutureExt,
    task::{ArcWake, FutureObj, waker},
};

/// Drives a single future on the caller's thread.
///
/// There is no reactor: the future only makes progress when the owner calls
/// [`run_until_stalled`](Self::run_until_stalled), which is what lets the
/// core run without an async runtime of its own. The only caller is
/// [`Driver::step`](super::driver::Driver::step), once per event handed to a
/// runtime or loader, so a stall means the future is waiting on IO or input.
pub(crate) struct LocalExecutor<T> {
    running: Option<FutureObj<'static, T>>,
}

struct WakeFlag {
    woken: AtomicBool,
}

impl ArcWake for WakeFlag {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.woken.store(true, Ordering::SeqCst);
    }
}

impl<T> LocalExecutor<T> {
    pub(crate) fn spawn<Fut: Future<Output = T> + Send + 'static>(fut: Fut) -> Self {
        Self {
            running: Some(FutureObj::new(Box::new(fut))),
        }
    }

    /// Poll until the future is pending without having woken itself.
    ///
    /// Returns the output once the future completes.
    ///
    /// # Panics
    ///
    /// If called again after the future has completed.
    pub(crate) fn run_until_stalled(&mut self) -> Option<T> {
        let flag = Arc::new(WakeFlag {
            woken: AtomicBool::new(false),
        });
        let waker = waker(flag.clone());
        let mut cx = Context::from_waker(&waker);
        loop {
            let Some(running) = &mut self.running else {
                panic!("polled local executor after its future finished");
            };
            match running.poll_unpin(&mut cx) {
                Poll::Ready(result) => {
                    self.running = None;
                    return Some(result);
                }
                Poll::Pending => {
                    // Futures may wake themselves while being polled
                    if !flag.woken.swap(false, Ordering::SeqCst) {
                        return None;
                    }
                }
            }
        }
    }
}
