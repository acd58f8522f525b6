use crate::error::{self, Error};
use crate::primitives::{BoundingBox2D, Coordinate2D};
use crate::util::Result;
use geo::{Coord, LineString, Polygon};
use h3o::{CellIndex, LatLng, Resolution};
use snafu::{ResultExt, ensure};
use std::fmt;
use std::str::FromStr;

/// An H3 cell, identified by its 15 character hexadecimal index.
///
/// The resolution is encoded in the identifier itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SpatialCell(CellIndex);

impl SpatialCell {
    /// The cell of `resolution` that contains `coordinate` (x = longitude, y = latitude)
    pub fn containing(coordinate: Coordinate2D, resolution: u8) -> Result<Self> {
        let invalid = || Error::InvalidCellLocation {
            coordinate,
            resolution,
        };

        let resolution = Resolution::try_from(resolution).map_err(|_| invalid())?;
        let lat_lng = LatLng::new(coordinate.y, coordinate.x).map_err(|_| invalid())?;

        Ok(Self(lat_lng.to_cell(resolution)))
    }

    pub fn index(&self) -> CellIndex {
        self.0
    }

    pub fn resolution(&self) -> u8 {
        u8::from(self.0.resolution())
    }

    /// The cells within `k` grid steps of this cell, including the cell itself
    pub fn disk(&self, k: u32) -> Vec<SpatialCell> {
        self.0
            .grid_disk::<Vec<_>>(k)
            .into_iter()
            .map(SpatialCell)
            .collect()
    }

    /// The cell boundary as a closed ring of `(lon, lat)` vertices.
    ///
    /// Cells crossing the antimeridian are unwrapped into the `[0, 360)` longitude range,
    /// so that the ring stays a simple polygon. Lookups on geographic rasters wrap such
    /// polygons back into `[-180, 180]`.
    pub fn polygon(&self) -> Polygon<f64> {
        let mut vertices: Vec<Coord<f64>> = self
            .0
            .boundary()
            .iter()
            .map(|lat_lng| Coord {
                x: lat_lng.lng(),
                y: lat_lng.lat(),
            })
            .collect();

        let (min_x, max_x) = vertices
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), c| {
                (min.min(c.x), max.max(c.x))
            });

        if max_x - min_x > 180.0 {
            for vertex in &mut vertices {
                if vertex.x < 0.0 {
                    vertex.x += 360.0;
                }
            }
        }

        // closes the ring
        Polygon::new(LineString::from(vertices), vec![])
    }

    /// The bounding box of the cell's polygon
    pub fn bounds(&self) -> BoundingBox2D {
        polygon_bounds(&self.polygon())
    }
}

impl fmt::Display for SpatialCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpatialCell {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cell = s.trim();
        CellIndex::from_str(cell)
            .map(Self)
            .context(error::InvalidCell { cell })
    }
}

impl From<CellIndex> for SpatialCell {
    fn from(index: CellIndex) -> Self {
        Self(index)
    }
}

fn polygon_bounds(polygon: &Polygon<f64>) -> BoundingBox2D {
    BoundingBox2D::from_coord_iter(polygon.exterior().coords().map(|&c| c.into()))
        .unwrap_or_else(|| {
            BoundingBox2D::new_unchecked(Coordinate2D::default(), Coordinate2D::default())
        })
}

/// A cell together with its resolved geometry
#[derive(Debug, Clone, PartialEq)]
pub struct CellGeometry {
    pub cell: SpatialCell,
    pub polygon: Polygon<f64>,
    pub bounds: BoundingBox2D,
}

impl From<SpatialCell> for CellGeometry {
    fn from(cell: SpatialCell) -> Self {
        let polygon = cell.polygon();
        let bounds = polygon_bounds(&polygon);

        Self {
            cell,
            polygon,
            bounds,
        }
    }
}

/// A non-empty batch of cells that share one resolution, with resolved geometries.
#[derive(Debug, Clone, PartialEq)]
pub struct CellBatch {
    geometries: Vec<CellGeometry>,
    resolution: u8,
    bounds: BoundingBox2D,
}

impl CellBatch {
    /// Resolves the geometries of `cells`, keeping their order
    ///
    /// # Errors
    ///
    /// Fails if `cells` is empty or the cells do not share one resolution
    ///
    pub fn new(cells: Vec<SpatialCell>) -> Result<Self> {
        let resolution = common_resolution(&cells)?;

        let geometries: Vec<CellGeometry> = cells.into_iter().map(CellGeometry::from).collect();
        let bounds = geometries
            .iter()
            .map(|geometry| geometry.bounds)
            .reduce(|a, b| a.union(&b))
            .ok_or(Error::EmptyCellBatch)?;

        Ok(Self {
            geometries,
            resolution,
            bounds,
        })
    }

    /// Parses and resolves a batch of cell identifiers
    pub fn parse<I, S>(identifiers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cells = identifiers
            .into_iter()
            .map(|identifier| identifier.as_ref().parse())
            .collect::<Result<Vec<SpatialCell>>>()?;

        Self::new(cells)
    }

    pub fn geometries(&self) -> &[CellGeometry] {
        &self.geometries
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    /// The bounding box of the union of all cell polygons
    pub fn bounds(&self) -> BoundingBox2D {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// The bounding box `(west, south, east, north)` of the union of all cell polygons
pub fn union_bounds(cells: &[SpatialCell]) -> Result<BoundingBox2D> {
    cells
        .iter()
        .map(SpatialCell::bounds)
        .reduce(|a, b| a.union(&b))
        .ok_or(Error::EmptyCellBatch)
}

/// The resolution all `cells` share
pub fn common_resolution(cells: &[SpatialCell]) -> Result<u8> {
    let first = cells.first().ok_or(Error::EmptyCellBatch)?;
    let expected = first.resolution();

    for cell in cells {
        let found = cell.resolution();
        ensure!(
            found == expected,
            error::MixedResolution {
                expected,
                found,
                cell: cell.to_string(),
            }
        );
    }

    Ok(expected)
}
