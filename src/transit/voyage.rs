use log::{info, warn};
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;

use crate::field::BodyLookup;
use crate::geometry::Point2D;
use crate::transit::controller::{TransitController, TransitError};
use crate::transit::events::{TransitEvent, VesselId};
use crate::BodyId;

/// Outcome of flying a controller to a destination with a fixed time step.
#[derive(Debug, Clone, Serialize)]
pub struct VoyageReport {
    pub destination: BodyId,
    /// Ticks run in total.
    pub ticks: usize,
    /// Tick on which the vessel left orbit, counting from 1.
    pub departed_at: Option<usize>,
    /// Tick on which the vessel settled around the destination.
    pub arrived_at: Option<usize>,
    pub final_anchor: BodyId,
    pub final_position: Point2D,
    pub peak_speed: f32,
    pub events: Vec<TransitEvent>,
}

impl VoyageReport {
    pub fn arrived(&self) -> bool {
        self.arrived_at.is_some()
    }
}

/// Requests travel to `destination` and ticks until arrival or `max_ticks`.
///
/// Only the controller's own events are recorded; a bus shared with other
/// vessels does not leak into the report.
pub fn simulate_voyage<L: BodyLookup + ?Sized>(
    controller: &mut TransitController,
    bodies: &L,
    destination: BodyId,
    dt: f32,
    max_ticks: usize,
) -> Result<VoyageReport, TransitError> {
    let mut rx = controller.subscribe();
    controller.request_travel(destination, bodies)?;

    let mut report = VoyageReport {
        destination,
        ticks: 0,
        departed_at: None,
        arrived_at: None,
        final_anchor: controller.current_anchor().body,
        final_position: controller.current_position(),
        peak_speed: 0.0,
        events: Vec::new(),
    };

    let vessel = controller.vessel();
    drain(&mut rx, vessel, &mut report);
    while report.ticks < max_ticks && report.arrived_at.is_none() {
        controller.tick(dt, bodies);
        report.ticks += 1;
        if let Some(plan) = controller.plan() {
            report.peak_speed = report.peak_speed.max(plan.speed);
        }
        drain(&mut rx, vessel, &mut report);
    }

    report.final_anchor = controller.current_anchor().body;
    report.final_position = controller.current_position();
    if report.arrived() {
        info!(
            "Vessel {} reached body {} after {} ticks",
            controller.vessel(),
            destination,
            report.ticks
        );
    } else {
        warn!(
            "Vessel {} still en route to body {} after {} ticks",
            controller.vessel(),
            destination,
            report.ticks
        );
    }
    Ok(report)
}

fn drain(
    rx: &mut tokio::sync::broadcast::Receiver<TransitEvent>,
    vessel: VesselId,
    report: &mut VoyageReport,
) {
    loop {
        match rx.try_recv() {
            Ok(event) if event.vessel() != vessel => {}
            Ok(event) => {
                match &event {
                    TransitEvent::Departed { .. } => report.departed_at = Some(report.ticks),
                    TransitEvent::Arrived { anchor, .. } if *anchor == report.destination => {
                        report.arrived_at = Some(report.ticks)
                    }
                    _ => {}
                }
                report.events.push(event);
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Voyage log missed {skipped} transit events");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}
