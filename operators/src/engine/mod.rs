mod execution_context;
mod zonal_engine;

pub use execution_context::{EngineOptions, ExecutionContext};
pub use zonal_engine::ZonalEngine;
