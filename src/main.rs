use lambda_runtime::{service_fn, Error, LambdaEvent};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use starmap_navigator::field::{generate_field, FieldConfig, NameRegistry, StarField};
use starmap_navigator::geometry::Point2D;
use starmap_navigator::spatial::{KDTree, SpatialError};
use starmap_navigator::transit::{simulate_voyage, TransitConfig, TransitController};
use starmap_navigator::BodyId;

/// Seed for the demo field; replace with a loaded dataset in production.
const SAMPLE_SEED: u64 = 0x5eed;
const DEFAULT_MAX_TICKS: usize = 20_000;

static SAMPLE_FIELD: Lazy<StarField> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    generate_field(&FieldConfig::default(), &mut rng, &mut NameRegistry::new()).unwrap_or_else(
        |err| {
            log::error!("Sample field generation failed: {err}");
            StarField::default()
        },
    )
});

static SAMPLE_KD: Lazy<Result<KDTree, SpatialError>> =
    Lazy::new(|| KDTree::build(&SAMPLE_FIELD.bodies));

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineRequest {
    Nearest {
        point: [f32; 2],
    },
    NearestWithin {
        origin: [f32; 2],
        radius: f32,
        count: usize,
    },
    Pick {
        point: [f32; 2],
    },
    Voyage {
        from_id: BodyId,
        to_id: BodyId,
        max_ticks: Option<usize>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineResponse {
    Nearest {
        body: BodyResult,
    },
    NearestWithin {
        bodies: Vec<BodyResult>,
    },
    Pick {
        body: Option<BodyResult>,
    },
    Voyage {
        arrived: bool,
        ticks: usize,
        departed_at: Option<usize>,
        arrived_at: Option<usize>,
        final_anchor: BodyId,
        final_position: [f32; 2],
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct BodyResult {
    id: BodyId,
    name: String,
    distance: f32,
}

fn body_result(field: &StarField, index: usize, distance: f32) -> BodyResult {
    let b = &field.bodies[index];
    BodyResult {
        id: b.id,
        name: b.name.clone(),
        distance,
    }
}

fn error(message: impl ToString) -> EngineResponse {
    EngineResponse::Error {
        message: message.to_string(),
    }
}

async fn handler(event: LambdaEvent<EngineRequest>) -> Result<EngineResponse, Error> {
    let field = &*SAMPLE_FIELD;
    let kd = match &*SAMPLE_KD {
        Ok(kd) => kd,
        Err(err) => return Ok(error(err)),
    };

    let req = event.payload;
    match req {
        EngineRequest::Nearest { point } => match kd.nearest(point.into()) {
            Ok(hit) => Ok(EngineResponse::Nearest {
                body: body_result(field, hit.index, hit.distance),
            }),
            Err(err) => Ok(error(err)),
        },
        EngineRequest::NearestWithin {
            origin,
            radius,
            count,
        } => {
            let bodies = kd
                .nearest_n_within_radius(origin.into(), radius, count)
                .into_iter()
                .map(|(idx, d)| body_result(field, idx, d))
                .collect();
            Ok(EngineResponse::NearestWithin { bodies })
        }
        EngineRequest::Pick { point } => match kd.pick(Point2D::from(point)) {
            Ok(hit) => Ok(EngineResponse::Pick {
                body: hit.map(|h| body_result(field, h.index, h.distance)),
            }),
            Err(err) => Ok(error(err)),
        },
        EngineRequest::Voyage {
            from_id,
            to_id,
            max_ticks,
        } => {
            let config = TransitConfig::default();
            let dt = config.reference_frame;
            let mut vessel = match TransitController::new(0, from_id, 0.0, config, field) {
                Ok(vessel) => vessel,
                Err(err) => return Ok(error(err)),
            };
            let max_ticks = max_ticks.unwrap_or(DEFAULT_MAX_TICKS);
            match simulate_voyage(&mut vessel, field, to_id, dt, max_ticks) {
                Ok(report) => Ok(EngineResponse::Voyage {
                    arrived: report.arrived(),
                    ticks: report.ticks,
                    departed_at: report.departed_at,
                    arrived_at: report.arrived_at,
                    final_anchor: report.final_anchor,
                    final_position: report.final_position.into(),
                }),
                Err(err) => Ok(error(err)),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let func = service_fn(handler);
    lambda_runtime::run(func).await
}
