// The processing loop: dequeue → decode → embed → encode → enqueue, one item
// at a time, until the connection is observed down. Failure policy is
// at-most-once: a popped item is never requeued; every recoverable error is
// logged and the item discarded.

use crate::config;
use crate::embeddings::SentenceEncoder;
use crate::protocol::{self, CodecError, Envelope};
use crate::queue::Queue;

/// Where responses go. The two historical wire shapes differ only here:
/// either the operator fixes one result queue at startup, or every message
/// names its own in `result_queue`.
pub enum DestinationPolicy {
    Fixed(String),
    PerMessage,
}

impl DestinationPolicy {
    fn resolve<'a>(&'a self, envelope: &'a Envelope) -> Result<&'a str, CodecError> {
        match self {
            DestinationPolicy::Fixed(queue) => Ok(queue),
            DestinationPolicy::PerMessage => {
                envelope.result_queue.as_deref().ok_or(CodecError::Validation {
                    field: "result_queue",
                    reason: "missing",
                })
            }
        }
    }
}

/// Run until the connection drops. Returns the number of responses pushed.
pub fn run(
    queue: &mut dyn Queue,
    model: &dyn SentenceEncoder,
    input_queue: &str,
    destination: &DestinationPolicy,
) -> u64 {
    let input_queues = vec![input_queue.to_string()];
    let mut processed: u64 = 0;

    while queue.is_alive() {
        let (source, payload) = match queue.blocking_pop(&input_queues, config::queue::BLPOP_TIMEOUT_SECS) {
            Ok(Some(item)) => item,
            // Timeout: nothing consumed, nothing produced; block again.
            Ok(None) => continue,
            Err(e) => {
                // A dead connection surfaces here; the is_alive check above
                // decides whether the loop keeps going.
                log::error!("Dequeue failed: {:?}", e);
                continue;
            }
        };

        let mut envelope = match protocol::decode(&payload) {
            Ok(env) => env,
            Err(e) => {
                log::error!("Discarding item from {}: {}", source, e);
                continue;
            }
        };

        match envelope.id {
            Some(id) => log::info!("Received request id={} from {}", id, source),
            None => log::info!("Received request from {}", source),
        }

        let text = match envelope.text_tokenized() {
            Ok(t) => t.to_string(),
            Err(e) => {
                log::error!("Discarding item from {}: {}", source, e);
                continue;
            }
        };
        let result_queue = match destination.resolve(&envelope) {
            Ok(d) => d.to_string(),
            Err(e) => {
                log::error!("Discarding item from {}: {}", source, e);
                continue;
            }
        };

        // An empty vector here means numeric failure; it is still a valid,
        // deliverable response, not an error path.
        let vector = model.sentence_vector(&text);
        if vector.is_empty() {
            log::warn!("Delivering empty sentence_vector for request from {}", source);
        }
        envelope.sentence_vector = Some(vector);

        let raw = match protocol::encode(&envelope) {
            Ok(r) => r,
            Err(e) => {
                log::error!("Discarding response for {}: {}", result_queue, e);
                continue;
            }
        };

        if let Err(e) = queue.push(&result_queue, &raw) {
            log::error!("Failed pushing response to {}: {:?}", result_queue, e);
            continue;
        }
        processed += 1;
        log::info!("Response pushed to {}", result_queue);

        if envelope.is_single_request() {
            if let Err(e) = queue.expire(&result_queue, config::queue::SINGLE_REQUEST_TTL_SECS) {
                log::warn!("Failed setting TTL on {}: {:?}", result_queue, e);
            }
        }
    }

    processed
}
