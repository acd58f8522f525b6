mod proj_projector;
mod result;

pub use proj_projector::ProjCoordinateProjector;
pub use result::Result;
