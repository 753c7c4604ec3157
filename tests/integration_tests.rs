use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starmap_navigator::data::{deserialize_field, serialize_field};
use starmap_navigator::field::{generate_field, BodyLookup, FieldConfig, NameRegistry, StarField};
use starmap_navigator::geometry::Point2D;
use starmap_navigator::scene::Scene;
use starmap_navigator::spatial::{KDTree, SharedIndex};
use starmap_navigator::transit::{simulate_voyage, TransitConfig, TransitController, TransitEvent};
use starmap_navigator::Body;

fn brute_force_nearest(bodies: &[Body], q: Point2D) -> f32 {
    bodies
        .iter()
        .map(|b| b.pos.distance_squared(&q))
        .fold(f32::INFINITY, f32::min)
}

#[test]
fn integration_end_to_end_generated_field() {
    let mut rng = StdRng::seed_from_u64(2024);
    let config = FieldConfig {
        count: 300,
        ..FieldConfig::default()
    };
    let field = generate_field(&config, &mut rng, &mut NameRegistry::new()).expect("field");
    assert_eq!(field.len(), 300);

    // KD-tree nearest
    let kd = KDTree::build(&field.bodies).expect("tree");
    let target = field.bodies[17].pos;
    assert_eq!(kd.nearest(target).expect("nearest").id, field.bodies[17].id);

    // Dataset round trip
    let bytes = serialize_field(&field).expect("serialize");
    let restored = deserialize_field(&bytes).expect("deserialize");
    assert_eq!(restored.bodies, field.bodies);

    // Voyage between two generated bodies
    let from = field.bodies[0].id;
    let to = field.bodies[1].id;
    let transit = TransitConfig::default();
    let dt = transit.reference_frame;
    let mut vessel = TransitController::new(1, from, 0.0, transit, &restored).expect("vessel");
    let report = simulate_voyage(&mut vessel, &restored, to, dt, 100_000).expect("voyage");
    assert!(report.arrived());
    let dest = restored.position_of(to).expect("destination");
    assert!((vessel.current_position().distance(&dest) - 20.0).abs() < 1e-2);
}

#[test]
fn ten_thousand_queries_match_linear_scan() {
    let mut rng = StdRng::seed_from_u64(77);
    let bodies: Vec<Body> = (0..1_000)
        .map(|i| {
            let p = Point2D::new(rng.gen_range(-5_000.0..5_000.0), rng.gen_range(-5_000.0..5_000.0));
            Body::new(i + 1, format!("S{i}"), p)
        })
        .collect();
    let kd = KDTree::build(&bodies).expect("tree");

    for _ in 0..10_000 {
        let q = Point2D::new(rng.gen_range(-6_000.0..6_000.0), rng.gen_range(-6_000.0..6_000.0));
        let hit = kd.nearest(q).expect("nearest");
        let expected = brute_force_nearest(&bodies, q);
        assert_eq!(bodies[hit.index].pos.distance_squared(&q), expected, "query {q:?}");
        assert_eq!(kd.nearest(q).expect("nearest"), hit);
    }
}

#[test]
fn concrete_two_body_scenario() {
    let field = StarField::new(vec![
        Body::new(1, "A", Point2D::new(0.0, 0.0)),
        Body::new(2, "B", Point2D::new(300.0, 0.0)),
    ])
    .expect("field");
    let config = TransitConfig {
        orbit_radius: 20.0,
        ..TransitConfig::default()
    };
    let dt = config.reference_frame;
    let period = config.orbital_period_frames().ceil() as usize;
    let max_step = config.max_speed + 1e-2;
    let mut vessel = TransitController::new(1, 1, 0.0, config, &field).expect("vessel");

    vessel.request_travel(2, &field).expect("course");
    assert_eq!(vessel.plan().expect("plan").transit_angle, 0.0);
    assert!(!vessel.is_transiting());

    // at angle 0 the vessel is heading north; it swings round to face B
    let mut ticks = 0;
    while !vessel.is_transiting() {
        vessel.tick(dt, &field);
        ticks += 1;
        assert!(ticks <= period, "no departure within one orbit");
    }
    assert!(vessel.current_heading().abs() < 0.02);

    let b = Point2D::new(300.0, 0.0);
    let mut closest = f32::INFINITY;
    let mut ticks = 0;
    while vessel.is_transiting() {
        let before = vessel.current_position();
        vessel.tick(dt, &field);
        assert!(vessel.current_position().distance(&before) <= max_step);
        closest = closest.min(vessel.current_position().distance(&b));
        ticks += 1;
        assert!(ticks < 5_000, "never arrived");
    }
    assert_eq!(vessel.current_anchor().body, 2);
    assert!(!vessel.is_transiting());
    assert!(closest >= 19.9, "flew through B at {closest}");
    assert!((vessel.current_position().distance(&b) - 20.0).abs() < 1e-3);
}

#[test]
fn shared_bus_carries_events_from_many_vessels() {
    let field = StarField::new(vec![
        Body::new(1, "A", Point2D::new(0.0, 0.0)),
        Body::new(2, "B", Point2D::new(120.0, 0.0)),
    ])
    .expect("field");
    let bus = starmap_navigator::transit::EventBus::default();
    let mut rx = bus.subscribe();

    let mut a = TransitController::new(10, 1, 0.0, TransitConfig::default(), &field)
        .expect("vessel")
        .with_event_bus(bus.clone());
    let mut b = TransitController::new(20, 2, 0.0, TransitConfig::default(), &field)
        .expect("vessel")
        .with_event_bus(bus);

    a.request_travel(2, &field).expect("course");
    b.request_travel(1, &field).expect("course");

    let mut vessels = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert!(matches!(event, TransitEvent::CourseSet { .. }));
        vessels.push(event.vessel());
    }
    assert_eq!(vessels, vec![10, 20]);
}

#[test]
fn scene_picks_travels_and_refreshes() {
    let field = StarField::new(vec![
        Body::new(1, "Home", Point2D::new(0.0, 0.0)),
        Body::new(2, "Moon", Point2D::new(0.0, 150.0)).with_selection_radius(25.0),
    ])
    .expect("field");
    let mut scene = Scene::new(field, 1, 1, TransitConfig::default()).expect("scene");

    assert_eq!(scene.travel_to_point(Point2D::new(15.0, 140.0)).expect("travel"), Some(2));
    let dt = scene.vessel().config().reference_frame;
    let mut ticks = 0;
    while scene.vessel().current_anchor().body != 2 {
        scene.advance(dt);
        ticks += 1;
        assert!(ticks < 10_000);
    }

    let snapshot: std::sync::Arc<KDTree> = scene.index().load();
    scene.move_body(2, Point2D::new(400.0, 400.0));
    scene.refresh_index().expect("refresh");
    assert_eq!(snapshot.nearest(Point2D::new(0.0, 150.0)).expect("nearest").id, 2);
    assert_eq!(scene.select_at(Point2D::new(0.0, 150.0)).expect("select"), None);
    let fresh = SharedIndex::build(&scene.field.bodies).expect("index");
    assert_eq!(fresh.load().nearest(Point2D::new(390.0, 390.0)).expect("nearest").id, 2);
}
