use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tracing::instrument;

use crate::{
    error::Error, primitives::Coordinate2D, spatial_reference::SpatialReference,
    util::result::Result,
};

/// Projects coordinates between two spatial references with `proj4rs`.
///
/// Geographic references are handled in degrees at the interface; the
/// radian conversion `proj4rs` expects happens internally.
pub struct ProjCoordinateProjector {
    pub from: SpatialReference,
    pub to: SpatialReference,
    source: Proj,
    target: Proj,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl std::fmt::Debug for ProjCoordinateProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjCoordinateProjector")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl ProjCoordinateProjector {
    #[instrument]
    pub fn from_known_srs(from: SpatialReference, to: SpatialReference) -> Result<Self> {
        let source = Self::proj(from, to, from)?;
        let target = Self::proj(from, to, to)?;

        Ok(Self {
            from,
            to,
            source,
            target,
            source_is_geographic: from.is_geographic(),
            target_is_geographic: to.is_geographic(),
        })
    }

    fn proj(
        from: SpatialReference,
        to: SpatialReference,
        spatial_reference: SpatialReference,
    ) -> Result<Proj> {
        let definition = spatial_reference
            .proj_string()
            .ok_or(Error::UnknownSpatialReference { spatial_reference })?;

        Proj::from_proj_string(definition).map_err(|e| Error::NoCoordinateProjector {
            from,
            to,
            reason: format!("{e:?}"),
        })
    }

    pub fn project_coordinate(&self, c: Coordinate2D) -> Result<Coordinate2D> {
        if self.from == self.to {
            return Ok(c);
        }

        let mut point = if self.source_is_geographic {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };

        transform(&self.source, &self.target, &mut point).map_err(|e| {
            Error::CoordinateProjection {
                coordinate: c,
                reason: format!("{e:?}"),
            }
        })?;

        let projected = if self.target_is_geographic {
            Coordinate2D::new(point.0.to_degrees(), point.1.to_degrees())
        } else {
            Coordinate2D::new(point.0, point.1)
        };

        if projected.is_finite() {
            Ok(projected)
        } else {
            Err(Error::CoordinateProjection {
                coordinate: c,
                reason: "projection produced a non-finite coordinate".to_string(),
            })
        }
    }

    #[instrument(skip_all)]
    pub fn project_coordinates<A: AsRef<[Coordinate2D]>>(
        &self,
        coords: A,
    ) -> Result<Vec<Coordinate2D>> {
        coords
            .as_ref()
            .iter()
            .map(|&c| self.project_coordinate(c))
            .collect()
    }

    pub fn source_srs(&self) -> SpatialReference {
        self.from
    }

    pub fn target_srs(&self) -> SpatialReference {
        self.to
    }
}
