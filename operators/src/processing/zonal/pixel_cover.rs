use geo::{BoundingRect, Coord, Intersects, LineString, MapCoords, Polygon, Rect};
use hexstats_datatypes::primitives::{BoundingBox2D, Coordinate2D};
use hexstats_datatypes::raster::{GridIdx2D, RasterField};
use hexstats_datatypes::util::ProjCoordinateProjector;

use crate::error::Error;
use crate::util::Result;

use super::rasterization::RasterizationMode;

/// Creates a context to check points against a polygon with holes
///
/// The algorithm is taken from <http://alienryderflex.com/polygon/>
///
pub struct PointInPolygonTester {
    rings: Vec<RingTester>,
}

struct RingTester {
    coordinates: Vec<Coordinate2D>,
    constants: Vec<f64>,
    multiples: Vec<f64>,
}

impl RingTester {
    fn new(ring: &LineString<f64>) -> Self {
        let coordinates: Vec<Coordinate2D> = ring.coords().map(|&c| c.into()).collect();
        let (constants, multiples) = Self::precalculate_ring(&coordinates);

        Self {
            coordinates,
            constants,
            multiples,
        }
    }

    fn number_of_corners(coordinates: &[Coordinate2D]) -> usize {
        // rings are closed, the last coordinate repeats the first
        coordinates.len().saturating_sub(1)
    }

    fn precalculate_ring(coordinates: &[Coordinate2D]) -> (Vec<f64>, Vec<f64>) {
        let number_of_corners = Self::number_of_corners(coordinates);
        let mut constants = vec![0.; number_of_corners];
        let mut multiples = vec![0.; number_of_corners];

        if number_of_corners == 0 {
            return (constants, multiples);
        }

        let mut j = number_of_corners - 1;

        for i in 0..number_of_corners {
            let c_i = coordinates[i];
            let c_j = coordinates[j];

            if float_cmp::approx_eq!(f64, c_j.y, c_i.y) {
                constants[i] = c_i.x;
                multiples[i] = 0.0;
            } else {
                constants[i] =
                    c_i.x - (c_i.y * c_j.x) / (c_j.y - c_i.y) + (c_i.y * c_i.x) / (c_j.y - c_i.y);
                multiples[i] = (c_j.x - c_i.x) / (c_j.y - c_i.y);
            }

            j = i;
        }

        (constants, multiples)
    }

    fn contains_coordinate(&self, coordinate: Coordinate2D) -> bool {
        let number_of_corners = Self::number_of_corners(&self.coordinates);
        if number_of_corners == 0 {
            return false;
        }

        let mut j = number_of_corners - 1;
        let mut odd_nodes = false;

        for i in 0..number_of_corners {
            let c_i = self.coordinates[i];
            let c_j = self.coordinates[j];

            if (c_i.y < coordinate.y && c_j.y >= coordinate.y)
                || (c_j.y < coordinate.y && c_i.y >= coordinate.y)
            {
                odd_nodes ^= coordinate.y * self.multiples[i] + self.constants[i] < coordinate.x;
            }

            j = i;
        }

        odd_nodes
    }
}

impl PointInPolygonTester {
    pub fn new(polygon: &Polygon<f64>) -> Self {
        let rings = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(RingTester::new)
            .collect();

        Self { rings }
    }

    /// Checks whether the coordinate lies inside the exterior ring and outside of all holes
    pub fn polygon_contains_coordinate(&self, coordinate: Coordinate2D) -> bool {
        let Some((exterior, interiors)) = self.rings.split_first() else {
            return false;
        };

        exterior.contains_coordinate(coordinate)
            && !interiors
                .iter()
                .any(|interior| interior.contains_coordinate(coordinate))
    }
}

/// Projects all vertices of a polygon
pub fn project_polygon(
    polygon: &Polygon<f64>,
    projector: &ProjCoordinateProjector,
) -> Result<Polygon<f64>> {
    let project_ring = |ring: &LineString<f64>| -> Result<LineString<f64>> {
        let coordinates: Vec<Coordinate2D> = ring.coords().map(|&c| c.into()).collect();
        let projected = projector.project_coordinates(coordinates)?;
        Ok(LineString::from(
            projected.into_iter().map(Coord::from).collect::<Vec<_>>(),
        ))
    };

    let exterior = project_ring(polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(project_ring)
        .collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

/// The pixels of `raster` that belong to `polygon` under `mode`.
///
/// The polygon must be given in the raster's spatial reference.
///
/// # Errors
///
/// Fails with `NoCoverage` if the polygon does not intersect the raster extent
///
pub fn pixel_cover(
    raster: &RasterField,
    polygon: &Polygon<f64>,
    mode: RasterizationMode,
    cell: &str,
) -> Result<Vec<GridIdx2D>> {
    let no_coverage = || Error::NoCoverage {
        cell: cell.to_string(),
    };

    let bounds: BoundingBox2D = polygon.bounding_rect().ok_or_else(no_coverage)?.into();
    let window = raster.pixel_window(bounds).ok_or_else(no_coverage)?;
    let geo_transform = raster.geo_transform();

    let pixels = match mode {
        RasterizationMode::Exact => {
            let tester = PointInPolygonTester::new(polygon);
            window
                .indices()
                .filter(|&idx| tester.polygon_contains_coordinate(geo_transform.pixel_center(idx)))
                .collect()
        }
        RasterizationMode::AllTouched => window
            .indices()
            .filter(|&idx| Rect::from(geo_transform.pixel_bounds(idx)).intersects(polygon))
            .collect(),
    };

    Ok(pixels)
}

/// [`pixel_cover`] for a WGS84 polygon that was unwrapped past the antimeridian.
///
/// The part of the polygon east of 180° is also looked up at `x - 360`, so that
/// rasters in `[-180, 180]` contribute their western pixels.
pub fn geographic_pixel_cover(
    raster: &RasterField,
    polygon: &Polygon<f64>,
    mode: RasterizationMode,
    cell: &str,
) -> Result<Vec<GridIdx2D>> {
    let crosses_antimeridian = polygon
        .bounding_rect()
        .is_some_and(|rect| rect.max().x > 180.0);

    if !crosses_antimeridian {
        return pixel_cover(raster, polygon, mode, cell);
    }

    let wrapped = polygon.map_coords(|c| Coord { x: c.x - 360.0, y: c.y });

    let mut pixels = Vec::new();
    let mut covered = false;

    for part in [polygon, &wrapped] {
        match pixel_cover(raster, part, mode, cell) {
            Ok(part_pixels) => {
                covered = true;
                pixels.extend(part_pixels);
            }
            Err(Error::NoCoverage { .. }) => {}
            Err(error) => return Err(error),
        }
    }

    if !covered {
        return Err(Error::NoCoverage {
            cell: cell.to_string(),
        });
    }

    pixels.sort_unstable();
    pixels.dedup();

    Ok(pixels)
}
