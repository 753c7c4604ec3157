use std::f32::consts::FRAC_PI_2;

use log::{debug, trace, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::field::BodyLookup;
use crate::geometry::{angular_difference, normalize_angle, Point2D};
use crate::transit::config::TransitConfig;
use crate::transit::events::{EventBus, TransitEvent, VesselId};
use crate::BodyId;

/// Rejected travel requests. The controller is left exactly as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitError {
    #[error("vessel is already orbiting body {0}")]
    SelfTravel(BodyId),
    #[error("course changes are not allowed mid-transit (bound for body {destination})")]
    InTransit { destination: BodyId },
    #[error("unknown body {0}")]
    UnknownBody(BodyId),
}

impl TransitError {
    /// True for requests that are invalid given the vessel's state, as opposed
    /// to requests naming a body that does not exist.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, TransitError::SelfTravel(_) | TransitError::InTransit { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitState {
    Orbiting,
    Transiting,
}

/// The body a vessel is orbiting, and where on the orbit it is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitAnchor {
    pub body: BodyId,
    /// Always in `(-π, π]`.
    pub orbit_angle: f32,
    pub orbit_radius: f32,
    /// Last position the body was seen at; used if it disappears from lookup.
    pub last_known: Point2D,
}

impl OrbitAnchor {
    fn resolve<L: BodyLookup + ?Sized>(&mut self, bodies: &L) -> Point2D {
        match bodies.position_of(self.body) {
            Some(pos) => self.last_known = pos,
            None => warn!(
                "Anchor body {} missing from lookup; holding last known position",
                self.body
            ),
        }
        self.last_known
    }
}

/// A course from the current anchor to a destination body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitPlan {
    pub origin: BodyId,
    pub destination: BodyId,
    /// Bearing from origin to destination when the course was set, in `(-π, π]`.
    pub transit_angle: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub previous_distance: Option<f32>,
    destination_last_known: Point2D,
}

impl TransitPlan {
    fn resolve_destination<L: BodyLookup + ?Sized>(&mut self, bodies: &L) -> Point2D {
        match bodies.position_of(self.destination) {
            Some(pos) => self.destination_last_known = pos,
            None => warn!(
                "Destination body {} missing from lookup; steering for last known position",
                self.destination
            ),
        }
        self.destination_last_known
    }
}

#[derive(Debug, Clone)]
enum Phase {
    /// `pending` holds a course that has been set but not yet departed on.
    Orbiting { pending: Option<TransitPlan> },
    Transiting(TransitPlan),
}

/// Orbit/transit state machine for one vessel.
///
/// The vessel circles its anchor counter-clockwise until a course is
/// requested, keeps circling until its heading lines up with the course,
/// leaves along the orbit tangent, and settles into orbit around the
/// destination once it has passed closest approach.
///
/// `heading` is the direction of travel: the orbit tangent while orbiting,
/// the course while in transit. Departure and arrival both happen where the
/// two agree, so the heading never jumps.
///
/// With static bodies the course line passes the destination at
/// `orbit_radius`, so closest approach is already on the new orbit.
#[derive(Debug, Clone)]
pub struct TransitController {
    vessel: VesselId,
    config: TransitConfig,
    anchor: OrbitAnchor,
    phase: Phase,
    position: Point2D,
    heading: f32,
    events: EventBus,
}

impl TransitController {
    pub fn new<L: BodyLookup + ?Sized>(
        vessel: VesselId,
        anchor: BodyId,
        orbit_angle: f32,
        config: TransitConfig,
        bodies: &L,
    ) -> Result<Self, TransitError> {
        let center = bodies
            .position_of(anchor)
            .ok_or(TransitError::UnknownBody(anchor))?;
        let orbit_angle = normalize_angle(orbit_angle);
        Ok(TransitController {
            vessel,
            anchor: OrbitAnchor {
                body: anchor,
                orbit_angle,
                orbit_radius: config.orbit_radius,
                last_known: center,
            },
            phase: Phase::Orbiting { pending: None },
            position: center.offset_polar(config.orbit_radius, orbit_angle),
            heading: normalize_angle(orbit_angle + FRAC_PI_2),
            config,
            events: EventBus::default(),
        })
    }

    /// Publishes into `bus` instead of the controller's own channel.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = bus;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransitEvent> {
        self.events.subscribe()
    }

    pub fn vessel(&self) -> VesselId {
        self.vessel
    }

    pub fn config(&self) -> &TransitConfig {
        &self.config
    }

    pub fn current_anchor(&self) -> &OrbitAnchor {
        &self.anchor
    }

    pub fn current_position(&self) -> Point2D {
        self.position
    }

    pub fn current_heading(&self) -> f32 {
        self.heading
    }

    pub fn is_transiting(&self) -> bool {
        matches!(self.phase, Phase::Transiting(_))
    }

    pub fn state(&self) -> TransitState {
        match self.phase {
            Phase::Orbiting { .. } => TransitState::Orbiting,
            Phase::Transiting(_) => TransitState::Transiting,
        }
    }

    /// The pending or active course, if any.
    pub fn plan(&self) -> Option<&TransitPlan> {
        match &self.phase {
            Phase::Orbiting { pending } => pending.as_ref(),
            Phase::Transiting(plan) => Some(plan),
        }
    }

    /// Sets a course for `destination`.
    ///
    /// The vessel stays in orbit until it is lined up with the course; a
    /// second request before then replaces the first.
    pub fn request_travel<L: BodyLookup + ?Sized>(
        &mut self,
        destination: BodyId,
        bodies: &L,
    ) -> Result<(), TransitError> {
        if let Phase::Transiting(plan) = &self.phase {
            return Err(TransitError::InTransit {
                destination: plan.destination,
            });
        }
        if destination == self.anchor.body {
            return Err(TransitError::SelfTravel(destination));
        }
        let target = bodies
            .position_of(destination)
            .ok_or(TransitError::UnknownBody(destination))?;

        let origin = self.anchor.resolve(bodies);
        let plan = TransitPlan {
            origin: self.anchor.body,
            destination,
            transit_angle: origin.bearing_to(&target),
            speed: 0.0,
            max_speed: self.config.max_speed,
            acceleration: self.config.acceleration,
            deceleration: self.config.deceleration,
            previous_distance: None,
            destination_last_known: target,
        };
        debug!(
            "Vessel {} course set {} -> {} at {:.3} rad",
            self.vessel, plan.origin, plan.destination, plan.transit_angle
        );
        self.events.publish(TransitEvent::CourseSet {
            vessel: self.vessel,
            origin: plan.origin,
            destination,
            transit_angle: plan.transit_angle,
        });
        self.phase = Phase::Orbiting {
            pending: Some(plan),
        };
        Ok(())
    }

    /// Advances the vessel by `dt` seconds.
    pub fn tick<L: BodyLookup + ?Sized>(&mut self, dt: f32, bodies: &L) {
        if !dt.is_finite() || dt < 0.0 {
            warn!("Vessel {} ignoring tick with dt {}", self.vessel, dt);
            return;
        }
        let frames = dt / self.config.reference_frame;

        match std::mem::replace(&mut self.phase, Phase::Orbiting { pending: None }) {
            Phase::Orbiting { pending } => self.tick_orbit(frames, pending, bodies),
            Phase::Transiting(plan) => self.tick_transit(frames, plan, bodies),
        }
    }

    fn tick_orbit<L: BodyLookup + ?Sized>(
        &mut self,
        frames: f32,
        pending: Option<TransitPlan>,
        bodies: &L,
    ) {
        let center = self.anchor.resolve(bodies);
        self.anchor.orbit_angle =
            normalize_angle(self.anchor.orbit_angle + self.config.orbit_rate * frames);
        self.place_on_orbit(center);

        let Some(plan) = pending else {
            return;
        };
        if angular_difference(self.heading, plan.transit_angle).abs()
            < self.config.alignment_tolerance
        {
            debug!(
                "Vessel {} departing body {} for {}",
                self.vessel, plan.origin, plan.destination
            );
            self.events.publish(TransitEvent::Departed {
                vessel: self.vessel,
                origin: plan.origin,
                destination: plan.destination,
                position: self.position,
            });
            self.phase = Phase::Transiting(plan);
        } else {
            self.phase = Phase::Orbiting {
                pending: Some(plan),
            };
        }
    }

    fn tick_transit<L: BodyLookup + ?Sized>(
        &mut self,
        frames: f32,
        mut plan: TransitPlan,
        bodies: &L,
    ) {
        let target = plan.resolve_destination(bodies);
        let d = self.position.distance(&target);

        plan.speed = if d > self.config.braking_distance {
            (plan.speed + plan.acceleration * frames).min(plan.max_speed)
        } else {
            (plan.speed - plan.deceleration * frames).max(self.config.floor_speed)
        };

        if plan.previous_distance.is_some_and(|prev| d > prev) {
            self.arrive(plan, target);
            return;
        }

        plan.previous_distance = Some(d);
        self.position = self
            .position
            .offset_polar(plan.speed * frames, plan.transit_angle);
        self.heading = plan.transit_angle;
        trace!(
            "Vessel {} at ({:.2}, {:.2}) speed {:.3}, {:.2} from body {}",
            self.vessel,
            self.position.x,
            self.position.y,
            plan.speed,
            d,
            plan.destination
        );
        self.phase = Phase::Transiting(plan);
    }

    /// Closest approach has passed: take up orbit around the destination at
    /// the angle the vessel currently sits at. The vessel is a fraction of a
    /// step past the tangent point, so the radial correction is tiny.
    fn arrive(&mut self, plan: TransitPlan, target: Point2D) {
        self.anchor = OrbitAnchor {
            body: plan.destination,
            orbit_angle: target.bearing_to(&self.position),
            orbit_radius: self.config.orbit_radius,
            last_known: target,
        };
        self.place_on_orbit(target);
        debug!(
            "Vessel {} arrived at body {} (orbit angle {:.3})",
            self.vessel, plan.destination, self.anchor.orbit_angle
        );
        self.events.publish(TransitEvent::Arrived {
            vessel: self.vessel,
            anchor: plan.destination,
            position: self.position,
            orbit_angle: self.anchor.orbit_angle,
        });
        self.phase = Phase::Orbiting { pending: None };
    }

    fn place_on_orbit(&mut self, center: Point2D) {
        self.position = center.offset_polar(self.anchor.orbit_radius, self.anchor.orbit_angle);
        self.heading = normalize_angle(self.anchor.orbit_angle + FRAC_PI_2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::StarField;
    use crate::Body;
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::PI;

    fn field(points: &[(u32, f32, f32)]) -> StarField {
        StarField::new(
            points
                .iter()
                .map(|&(id, x, y)| Body::new(id, format!("B{id}"), Point2D::new(x, y)))
                .collect(),
        )
        .expect("field")
    }

    fn controller(bodies: &StarField, anchor: BodyId, angle: f32) -> TransitController {
        TransitController::new(1, anchor, angle, TransitConfig::default(), bodies)
            .expect("controller")
    }

    fn frame() -> f32 {
        TransitConfig::default().reference_frame
    }

    #[test]
    fn starts_on_orbit() {
        let bodies = field(&[(1, 10.0, 10.0)]);
        let c = controller(&bodies, 1, 0.0);
        assert_eq!(c.state(), TransitState::Orbiting);
        assert_approx_eq!(c.current_position().x, 30.0, 1e-5);
        assert_approx_eq!(c.current_position().y, 10.0, 1e-5);
        assert_approx_eq!(c.current_heading(), FRAC_PI_2, 1e-6);
        assert!(c.plan().is_none());
    }

    #[test]
    fn unknown_start_anchor_is_rejected() {
        let bodies = field(&[(1, 0.0, 0.0)]);
        let err = TransitController::new(1, 5, 0.0, TransitConfig::default(), &bodies).unwrap_err();
        assert_eq!(err, TransitError::UnknownBody(5));
    }

    #[test]
    fn orbit_advances_with_dt_not_tick_count() {
        let bodies = field(&[(1, 0.0, 0.0)]);
        let mut fine = controller(&bodies, 1, 0.0);
        let mut coarse = controller(&bodies, 1, 0.0);
        for _ in 0..4 {
            fine.tick(frame(), &bodies);
        }
        coarse.tick(4.0 * frame(), &bodies);
        assert_approx_eq!(fine.current_anchor().orbit_angle, 0.04, 1e-5);
        assert_approx_eq!(coarse.current_anchor().orbit_angle, 0.04, 1e-5);
    }

    #[test]
    fn orbit_angle_wraps() {
        let bodies = field(&[(1, 0.0, 0.0)]);
        let mut c = controller(&bodies, 1, PI - 0.005);
        c.tick(frame(), &bodies);
        let angle = c.current_anchor().orbit_angle;
        assert!(angle > -PI && angle < -PI + 0.01, "angle {angle}");
    }

    #[test]
    fn bad_dt_is_ignored() {
        let bodies = field(&[(1, 0.0, 0.0)]);
        let mut c = controller(&bodies, 1, 0.3);
        let before = c.current_position();
        c.tick(f32::NAN, &bodies);
        c.tick(-1.0, &bodies);
        assert_eq!(c.current_position(), before);
    }

    #[test]
    fn self_travel_is_rejected_without_change() {
        let bodies = field(&[(1, 0.0, 0.0), (2, 100.0, 0.0)]);
        let mut c = controller(&bodies, 1, 1.0);
        assert_eq!(c.request_travel(1, &bodies), Err(TransitError::SelfTravel(1)));
        assert!(c.plan().is_none());
        assert!(TransitError::SelfTravel(1).is_invalid_request());
        assert!(!TransitError::UnknownBody(1).is_invalid_request());
    }

    #[test]
    fn unknown_destination_is_rejected() {
        let bodies = field(&[(1, 0.0, 0.0)]);
        let mut c = controller(&bodies, 1, 1.0);
        assert_eq!(c.request_travel(8, &bodies), Err(TransitError::UnknownBody(8)));
        assert!(c.plan().is_none());
    }

    fn depart(c: &mut TransitController, bodies: &StarField) -> usize {
        let period = c.config().orbital_period_frames().ceil() as usize;
        let mut ticks = 0;
        while !c.is_transiting() {
            c.tick(frame(), bodies);
            ticks += 1;
            assert!(ticks <= period, "no departure within one orbit");
        }
        ticks
    }

    #[test]
    fn pending_course_waits_for_alignment() {
        let bodies = field(&[(1, 0.0, 0.0), (2, 200.0, 0.0)]);
        let mut c = controller(&bodies, 1, 0.0);
        c.request_travel(2, &bodies).expect("course");
        let plan = *c.plan().expect("plan");
        assert_eq!(plan.transit_angle, 0.0);
        assert_eq!(plan.speed, 0.0);

        // heading starts at π/2; three quarters of a turn at 0.01 rad per frame
        let ticks = depart(&mut c, &bodies);
        assert!((460..480).contains(&ticks), "departed after {ticks}");
        assert!(c.current_heading().abs() < 0.02);
        // leaves from the tangent point below the anchor
        assert_approx_eq!(c.current_position().x, 0.0, 0.5);
        assert_approx_eq!(c.current_position().y, -20.0, 0.01);
    }

    #[test]
    fn already_aligned_course_departs_next_tick() {
        let bodies = field(&[(1, 0.0, 0.0), (2, 0.0, 200.0)]);
        let mut c = controller(&bodies, 1, 0.0);
        c.request_travel(2, &bodies).expect("course");
        assert_eq!(depart(&mut c, &bodies), 1);
    }

    #[test]
    fn later_request_replaces_pending_course() {
        let bodies = field(&[(1, 0.0, 0.0), (2, 0.0, 200.0), (3, -200.0, 0.0)]);
        let mut c = controller(&bodies, 1, 0.0);
        c.request_travel(2, &bodies).expect("course");
        c.request_travel(3, &bodies).expect("course");
        let plan = c.plan().expect("plan");
        assert_eq!(plan.destination, 3);
        assert_approx_eq!(plan.transit_angle, PI, 1e-6);
    }

    #[test]
    fn departs_arrives_and_publishes_in_order() {
        let bodies = field(&[(1, 0.0, 0.0), (2, 300.0, 0.0)]);
        let mut c = controller(&bodies, 1, 0.0);
        let mut rx = c.subscribe();

        c.request_travel(2, &bodies).expect("course");
        depart(&mut c, &bodies);

        let mut ticks = 0;
        while c.is_transiting() {
            c.tick(frame(), &bodies);
            let speed = c.plan().map_or(0.0, |p| p.speed);
            assert!((0.0..=2.0).contains(&speed));
            ticks += 1;
            assert!(ticks < 10_000);
        }
        assert_eq!(c.current_anchor().body, 2);
        assert!(c.plan().is_none());
        assert_approx_eq!(c.current_position().distance(&Point2D::new(300.0, 0.0)), 20.0, 1e-3);

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| match e {
                TransitEvent::CourseSet { .. } => "course",
                TransitEvent::Departed { .. } => "departed",
                TransitEvent::Arrived { .. } => "arrived",
            })
            .collect();
        assert_eq!(kinds, vec!["course", "departed", "arrived"]);
    }

    #[test]
    fn heading_is_continuous_through_departure_and_arrival() {
        let bodies = field(&[(1, 0.0, 0.0), (2, 300.0, 0.0)]);
        let config = TransitConfig::default();
        let step_limit = config.max_speed + 1e-2;
        let mut c = controller(&bodies, 1, 0.0);
        c.request_travel(2, &bodies).expect("course");

        let target = Point2D::new(300.0, 0.0);
        let mut closest = f32::INFINITY;
        let mut ticks = 0;
        loop {
            let (pos, heading, was_transiting) =
                (c.current_position(), c.current_heading(), c.is_transiting());
            c.tick(frame(), &bodies);
            ticks += 1;
            assert!(ticks < 10_000);

            assert!(
                c.current_position().distance(&pos) <= step_limit,
                "jumped {} on tick {ticks}",
                c.current_position().distance(&pos)
            );
            assert!(
                angular_difference(c.current_heading(), heading).abs() < 0.05,
                "heading swung on tick {ticks}"
            );
            if c.is_transiting() {
                closest = closest.min(c.current_position().distance(&target));
            }
            if was_transiting && !c.is_transiting() {
                break;
            }
        }
        assert_eq!(c.current_anchor().body, 2);
        assert_approx_eq!(closest, config.orbit_radius, 0.1);
        // settled on the near side of the tangent point, still heading east
        assert!(c.current_heading().abs() < 0.05);
    }

    #[test]
    fn mid_transit_request_is_rejected() {
        let bodies = field(&[(1, 0.0, 0.0), (2, 300.0, 0.0), (3, 0.0, 300.0)]);
        let mut c = controller(&bodies, 1, 0.0);
        c.request_travel(2, &bodies).expect("course");
        depart(&mut c, &bodies);
        c.tick(frame(), &bodies);
        let before = *c.plan().expect("plan");

        assert_eq!(
            c.request_travel(3, &bodies),
            Err(TransitError::InTransit { destination: 2 })
        );
        assert_eq!(*c.plan().expect("plan"), before);
        assert_eq!(c.current_anchor().body, 1);
    }

    #[test]
    fn follows_a_moving_anchor() {
        let mut bodies = field(&[(1, 0.0, 0.0)]);
        let mut c = controller(&bodies, 1, 0.0);
        bodies.set_position(1, Point2D::new(50.0, 0.0));
        c.tick(frame(), &bodies);
        assert_approx_eq!(c.current_position().distance(&Point2D::new(50.0, 0.0)), 20.0, 1e-4);
    }

    #[test]
    fn vanished_anchor_holds_last_known_position() {
        let bodies = field(&[(1, 5.0, 5.0)]);
        let mut c = controller(&bodies, 1, 0.0);
        let empty = StarField::default();
        c.tick(frame(), &empty);
        assert_approx_eq!(c.current_position().distance(&Point2D::new(5.0, 5.0)), 20.0, 1e-4);
    }
}
