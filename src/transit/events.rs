use log::trace;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::geometry::Point2D;
use crate::BodyId;

pub type VesselId = u32;

/// Events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// State changes published by a [`super::TransitController`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitEvent {
    CourseSet {
        vessel: VesselId,
        origin: BodyId,
        destination: BodyId,
        transit_angle: f32,
    },
    Departed {
        vessel: VesselId,
        origin: BodyId,
        destination: BodyId,
        position: Point2D,
    },
    Arrived {
        vessel: VesselId,
        anchor: BodyId,
        position: Point2D,
        orbit_angle: f32,
    },
}

impl TransitEvent {
    pub fn vessel(&self) -> VesselId {
        match self {
            TransitEvent::CourseSet { vessel, .. }
            | TransitEvent::Departed { vessel, .. }
            | TransitEvent::Arrived { vessel, .. } => *vessel,
        }
    }
}

/// Publish/subscribe channel for transit events.
///
/// Cloning shares the channel, so several controllers can publish into one
/// bus. Publishing never blocks; with no subscribers events are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TransitEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransitEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, event: TransitEvent) {
        trace!("Publishing {:?}", event);
        // Err only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
