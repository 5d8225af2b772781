pub mod movement;
pub mod passenger;
pub mod selection;
pub mod timing;
pub mod vehicle;

use std::sync::Arc;

use tracing::warn;

use crate::bus::Bus;
use crate::engine::timing::Timings;
use crate::models::message::{ActorId, Message};
use crate::observability::metrics::Metrics;

/// What every actor needs from its surroundings. Cheap to clone.
#[derive(Clone)]
pub struct ActorContext {
    pub bus: Arc<Bus>,
    pub timings: Timings,
    pub metrics: Metrics,
    pub average_speed: f64,
}

impl ActorContext {
    /// Best-effort send: a failed delivery is logged and counted, never propagated.
    pub(crate) async fn deliver(&self, from: &ActorId, to: &ActorId, message: Message) -> bool {
        let performative = message.performative();
        match self.bus.send(from, to, message).await {
            Ok(()) => true,
            Err(err) => {
                warn!(from = %from, to = %to, ?performative, error = %err, "message lost");
                self.metrics
                    .messages_dropped_total
                    .with_label_values(&[err.drop_reason()])
                    .inc();
                false
            }
        }
    }
}
