use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use super::Controller;

/// Work delivered to a running session.
pub enum Inbound {
    /// One framed message read by the transport.
    Message(Vec<String>),
    /// Raw tokens from an unframed stream.
    Tokens(Vec<String>),
    /// Arbitrary call on the controller, e.g. a request or a disconnect.
    Invoke(Box<dyn FnOnce(&mut Controller) + Send>),
}

/// Drive `controller` until `rx` closes, then hand it back.
///
/// Inbound batches and invocations run one at a time on this task, and
/// rate-limited sends are released from the same loop, so a timer release
/// never overlaps a send made by a command.
pub async fn run(mut controller: Controller, mut rx: mpsc::Receiver<Inbound>) -> Controller {
    info!("session started");
    loop {
        let deadline = controller.next_release(Instant::now());
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(Inbound::Message(tokens)) => controller.on_message(tokens),
                Some(Inbound::Tokens(tokens)) => controller.on_tokens(tokens),
                Some(Inbound::Invoke(f)) => f(&mut controller),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                controller.flush_outbound(Instant::now());
            }
        }
    }

    // Let queued sends go out before handing the controller back.
    while let Some(deadline) = controller.next_release(Instant::now()) {
        if !controller.is_connected() {
            break;
        }
        sleep_until(deadline).await;
        controller.flush_outbound(Instant::now());
    }
    debug!(pending = controller.pending_sends(), "session finished");
    controller
}
