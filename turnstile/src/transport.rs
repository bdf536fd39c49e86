use futures::channel::mpsc;
use turnstile_core::Output;

/// Where messages for other domains go once the effect that sent them has
/// been committed.
///
/// Delivery happens with the runtime locked, so implementations must hand
/// the output off rather than block on it.
pub trait Transport: Send + 'static {
    fn deliver(&mut self, output: Output);
}

/// Drops every output. The default for a runtime which only talks to
/// itself.
#[derive(Debug, Clone, Default)]
pub struct DiscardTransport;

impl Transport for DiscardTransport {
    fn deliver(&mut self, output: Output) {
        tracing::debug!(address=%output.address, "discarding output, no transport configured");
    }
}

/// Forwards every output to a channel, in commit order.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Output>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Output>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn deliver(&mut self, output: Output) {
        if let Err(e) = self.tx.unbounded_send(output) {
            tracing::warn!(address=%e.into_inner().address, "output receiver dropped");
        }
    }
}
