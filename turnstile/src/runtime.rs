#[cfg(feature = "tokio")]
mod tokio;

/// An executor the host side of the runtime spawns its IO loop onto.
///
/// The spawned task runs until the runtime stops, so implementations
/// detach it rather than handing back a join handle.
pub trait RuntimeHandle: Clone + 'static {
    fn spawn<F>(&self, f: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
