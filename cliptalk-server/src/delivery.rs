//! Hands synthesized utterances to the connected listener one at a time

use crate::messages::ServerEvent;
use crate::session::{ListenerHandle, Session};
use cliptalk_core::{AudioBuffer, InstrumentedQueue, PendingDelivery};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deliver items from `output` to `listener` until it disconnects.
///
/// Each item is selected as the current buffer, announced with `new-text` and
/// acknowledged; the loop then waits for an advance before taking the next.
/// An item taken while the listener is leaving goes back to the head of the
/// queue for the next listener; the item it was last playing is cancelled.
pub async fn run(
    session: Arc<Session>,
    output: InstrumentedQueue<PendingDelivery>,
    listener: Arc<ListenerHandle>,
) {
    let _turn = tokio::select! {
        turn = session.delivery_turn() => turn,
        _ = listener.closed() => {
            debug!("Listener {} left before its delivery started", listener.id());
            return;
        }
    };

    let mut advance = session.subscribe_advance();
    let mut announced: Option<AudioBuffer> = None;
    info!("Delivering to listener {}", listener.id());

    loop {
        let (pending, token) = tokio::select! {
            next = output.dequeue() => next,
            _ = listener.closed() => break,
        };

        if listener.is_closed() {
            token.requeue(pending);
            break;
        }

        session.select_buffer(pending.buffer.clone(), &mut advance);

        let event = ServerEvent::NewText {
            text: pending.text.as_str().to_string(),
            lang: pending.lang,
        };
        if let Err(e) = listener.send(event) {
            warn!("Could not announce {:?}: {}", pending.text.preview(), e);
            token.requeue(pending);
            break;
        }

        info!("Now playing {:?} ({})", pending.text.preview(), pending.lang);
        announced = Some(pending.buffer.clone());
        token.ack();

        tokio::select! {
            changed = advance.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = listener.closed() => break,
        }
    }

    // Nobody drains the announced audio anymore; a bounded buffer would
    // otherwise hold the worker in `write` forever
    if listener.is_closed() {
        if let Some(buffer) = announced {
            buffer.shutdown(true);
        }
    }

    info!("Delivery to listener {} ended", listener.id());
}
