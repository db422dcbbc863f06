use geo::{Area, BooleanOps, BoundingRect, Coord, Geometry, MapCoords, MultiPolygon, Polygon, Rect, Simplify};
use proj4rs::{proj::Proj, transform::transform};
use wkt::ToWkt;

use crate::error::{Error, Result};

/// Geographic lon/lat on WGS84 (degrees, converted to radians in code).
pub const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Spherical web mercator (EPSG:3857), metres.
pub const WEB_MERCATOR_PROJ4: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs";

/// Polygonal geometry in lon/lat order.
/// Every transform returns a new value; a Shape is never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Shape {
    /// Build a shape from the areal members of a polygon list.
    /// Rings that collapsed to a line or a point carry no area and are dropped here.
    /// Returns None when nothing areal is left.
    pub fn from_polygons(polygons: Vec<Polygon<f64>>) -> Option<Self> {
        let mut areal: Vec<Polygon<f64>> = polygons.into_iter().filter(is_areal).collect();
        match areal.len() {
            0 => None,
            1 => areal.pop().map(Shape::Polygon),
            _ => Some(Shape::MultiPolygon(MultiPolygon(areal))),
        }
    }

    /// Constituent polygons, in order.
    pub fn polygons(&self) -> &[Polygon<f64>] {
        match self {
            Shape::Polygon(polygon) => std::slice::from_ref(polygon),
            Shape::MultiPolygon(multi) => &multi.0,
        }
    }

    /// Flatten into single polygons, preserving order.
    pub fn into_polygons(self) -> Vec<Polygon<f64>> {
        match self {
            Shape::Polygon(polygon) => vec![polygon],
            Shape::MultiPolygon(multi) => multi.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons().iter().all(|p| p.exterior().0.is_empty())
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.polygons()
            .iter()
            .map(|p| p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>())
            .sum()
    }

    /// Area in the shape's own coordinate units.
    #[inline]
    pub fn planar_area(&self) -> f64 {
        match self {
            Shape::Polygon(polygon) => polygon.unsigned_area(),
            Shape::MultiPolygon(multi) => multi.unsigned_area(),
        }
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        let rect = match self {
            Shape::Polygon(polygon) => polygon.bounding_rect(),
            Shape::MultiPolygon(multi) => multi.bounding_rect(),
        };
        rect.map(BoundingBox::from)
    }

    /// Clip to a rectangle. Returns None when the overlap has no area.
    pub fn intersection(&self, rect: &Rect<f64>) -> Option<Self> {
        let clip = rect.to_polygon();
        let overlap = match self {
            Shape::Polygon(polygon) => polygon.intersection(&clip),
            Shape::MultiPolygon(multi) => multi.intersection(&clip),
        };
        Shape::from_polygons(overlap.0)
    }

    /// One Douglas-Peucker pass over every ring. Topology is not preserved.
    pub fn simplify(&self, tolerance: f64) -> Self {
        match self {
            Shape::Polygon(polygon) => Shape::Polygon(polygon.simplify(&tolerance)),
            Shape::MultiPolygon(multi) => Shape::MultiPolygon(multi.simplify(&tolerance)),
        }
    }

    /// Well-known text of the shape.
    pub fn to_wkt_string(&self) -> String {
        match self {
            Shape::Polygon(polygon) => polygon.wkt_string(),
            Shape::MultiPolygon(multi) => multi.wkt_string(),
        }
    }
}

fn is_areal(polygon: &Polygon<f64>) -> bool {
    polygon.exterior().0.len() >= 4 && polygon.unsigned_area() > 0.0
}

impl From<Polygon<f64>> for Shape {
    fn from(polygon: Polygon<f64>) -> Self {
        Shape::Polygon(polygon)
    }
}

impl From<MultiPolygon<f64>> for Shape {
    fn from(multi: MultiPolygon<f64>) -> Self {
        Shape::MultiPolygon(multi)
    }
}

impl TryFrom<Geometry<f64>> for Shape {
    type Error = Error;

    fn try_from(geometry: Geometry<f64>) -> Result<Self> {
        let shape = match geometry {
            Geometry::Polygon(polygon) => Shape::Polygon(polygon),
            Geometry::MultiPolygon(multi) => Shape::MultiPolygon(multi),
            Geometry::Rect(rect) => Shape::Polygon(rect.to_polygon()),
            Geometry::Triangle(triangle) => Shape::Polygon(triangle.to_polygon()),
            Geometry::GeometryCollection(collection) => {
                if collection.0.is_empty() {
                    return Err(Error::EmptyGeometry);
                }
                let mut polygons = Vec::new();
                for member in collection.0 {
                    match Shape::try_from(member) {
                        Ok(shape) => polygons.extend(shape.into_polygons()),
                        // points and lines in a mixed collection carry no area
                        Err(Error::NotPolygonal(_)) => {}
                        Err(err) => return Err(err),
                    }
                }
                if polygons.is_empty() {
                    return Err(Error::NotPolygonal("GeometryCollection"));
                }
                Shape::MultiPolygon(MultiPolygon(polygons))
            }
            Geometry::Point(_) => return Err(Error::NotPolygonal("Point")),
            Geometry::Line(_) => return Err(Error::NotPolygonal("Line")),
            Geometry::LineString(_) => return Err(Error::NotPolygonal("LineString")),
            Geometry::MultiPoint(_) => return Err(Error::NotPolygonal("MultiPoint")),
            Geometry::MultiLineString(_) => return Err(Error::NotPolygonal("MultiLineString")),
        };

        if shape.is_empty() {
            return Err(Error::EmptyGeometry);
        }
        Ok(shape)
    }
}

/// Bounding box structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64, // min longitude
    pub min_y: f64, // min latitude
    pub max_x: f64, // max longitude
    pub max_y: f64, // max latitude
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord { x: self.min_x, y: self.min_y },
            Coord { x: self.max_x, y: self.max_y },
        )
    }

    /// Cut the box in two across its longer side.
    /// Height >= width cuts at the vertical midpoint (lower half first),
    /// otherwise at the horizontal midpoint (left half first).
    pub fn halves(&self) -> [BoundingBox; 2] {
        let width = self.width();
        let height = self.height();
        if height >= width {
            let mid_y = self.min_y + height / 2.0;
            [
                BoundingBox::new(self.min_x, self.min_y, self.max_x, mid_y),
                BoundingBox::new(self.min_x, mid_y, self.max_x, self.max_y),
            ]
        } else {
            let mid_x = self.min_x + width / 2.0;
            [
                BoundingBox::new(self.min_x, self.min_y, mid_x, self.max_y),
                BoundingBox::new(mid_x, self.min_y, self.max_x, self.max_y),
            ]
        }
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Converts shapes between geographic lon/lat and a planar metric CRS.
pub struct Projector {
    geographic: Proj,
    planar: Proj,
}

impl Projector {
    /// Build from a geographic source and a planar target PROJ.4 definition.
    pub fn new(geographic: &str, planar: &str) -> Result<Self> {
        let geographic = Proj::from_proj_string(geographic)
            .map_err(|e| Error::Projection(format!("failed to build source PROJ.4 {geographic}: {e}")))?;
        let planar = Proj::from_proj_string(planar)
            .map_err(|e| Error::Projection(format!("failed to build target PROJ.4 {planar}: {e}")))?;
        Ok(Projector { geographic, planar })
    }

    /// WGS84 lon/lat to web mercator.
    pub fn web_mercator() -> Result<Self> {
        Self::new(WGS84_PROJ4, WEB_MERCATOR_PROJ4)
    }

    /// Degrees in, metres out.
    pub fn project_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.geographic, &self.planar, &mut point)
            .map_err(|e| Error::Projection(format!("({}, {}): {e}", coord.x, coord.y)))?;
        finite(coord, Coord { x: point.0, y: point.1 })
    }

    /// Metres in, degrees out.
    pub fn unproject_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x, coord.y, 0.0);
        transform(&self.planar, &self.geographic, &mut point)
            .map_err(|e| Error::Projection(format!("({}, {}): {e}", coord.x, coord.y)))?;
        finite(coord, Coord { x: point.0.to_degrees(), y: point.1.to_degrees() })
    }

    pub fn project(&self, shape: &Shape) -> Result<Shape> {
        map_shape(shape, |coord| self.project_coord(coord))
    }

    /// Projected surface area in square kilometres.
    /// An approximation for threshold tests, not a geodesic measurement.
    pub fn area_km2(&self, shape: &Shape) -> Result<f64> {
        if shape.is_empty() {
            return Err(Error::EmptyGeometry);
        }
        Ok(self.project(shape)?.planar_area() / 1e6)
    }

    /// Stopping predicate for the decomposer: projected area strictly below `limit_km2`.
    pub fn area_below(&self, shape: &Shape, limit_km2: f64) -> Result<bool> {
        Ok(self.area_km2(shape)? < limit_km2)
    }
}

fn finite(input: Coord<f64>, output: Coord<f64>) -> Result<Coord<f64>> {
    if output.x.is_finite() && output.y.is_finite() {
        Ok(output)
    } else {
        Err(Error::Projection(format!(
            "({}, {}) has no finite image",
            input.x, input.y
        )))
    }
}

fn map_shape(shape: &Shape, func: impl Fn(Coord<f64>) -> Result<Coord<f64>> + Copy) -> Result<Shape> {
    match shape {
        Shape::Polygon(polygon) => polygon.try_map_coords(func).map(Shape::Polygon),
        Shape::MultiPolygon(multi) => multi.try_map_coords(func).map(Shape::MultiPolygon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString, Point};

    fn unit_square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn test_bounding_box() {
        let bbox: BoundingBox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(bbox.min_x, 0.0);
        assert_eq!(bbox.max_x, 1.0);
        assert_eq!(bbox.width(), 1.0);
        assert_eq!(bbox.height(), 1.0);
    }

    #[test]
    fn test_halves_tie_goes_to_horizontal_cut() {
        let [a, b] = BoundingBox::new(0.0, 0.0, 2.0, 2.0).halves();
        assert_eq!(a, BoundingBox::new(0.0, 0.0, 2.0, 1.0));
        assert_eq!(b, BoundingBox::new(0.0, 1.0, 2.0, 2.0));
    }

    #[test]
    fn test_halves_wide_box_cuts_vertically() {
        let [a, b] = BoundingBox::new(0.0, 0.0, 4.0, 1.0).halves();
        assert_eq!(a, BoundingBox::new(0.0, 0.0, 2.0, 1.0));
        assert_eq!(b, BoundingBox::new(2.0, 0.0, 4.0, 1.0));
    }

    #[test]
    fn test_shape_from_geometry() {
        let shape = Shape::try_from(Geometry::Polygon(unit_square())).unwrap();
        assert_eq!(shape.polygons().len(), 1);
        assert!((shape.planar_area() - 1.0).abs() < 1e-12);

        let err = Shape::try_from(Geometry::Point(Point::new(1.0, 2.0))).unwrap_err();
        assert!(matches!(err, Error::NotPolygonal("Point")));

        let empty = Polygon::new(LineString::<f64>(vec![]), vec![]);
        let err = Shape::try_from(Geometry::Polygon(empty)).unwrap_err();
        assert!(matches!(err, Error::EmptyGeometry));
    }

    #[test]
    fn test_mixed_collection_keeps_polygons() {
        let collection = geo::GeometryCollection(vec![
            Geometry::Point(Point::new(5.0, 5.0)),
            Geometry::Polygon(unit_square()),
        ]);
        let shape = Shape::try_from(Geometry::GeometryCollection(collection)).unwrap();
        assert_eq!(shape.polygons().len(), 1);
    }

    #[test]
    fn test_from_polygons_drops_collapsed_rings() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        assert!(Shape::from_polygons(vec![sliver.clone()]).is_none());

        let shape = Shape::from_polygons(vec![sliver, unit_square()]).unwrap();
        assert!(matches!(shape, Shape::Polygon(_)));
    }

    #[test]
    fn test_intersection_with_half() {
        let shape = Shape::Polygon(unit_square());
        let rect = BoundingBox::new(0.0, 0.0, 1.0, 0.5).to_rect();
        let half = shape.intersection(&rect).unwrap();
        assert!((half.planar_area() - 0.5).abs() < 1e-9);

        let outside = BoundingBox::new(3.0, 3.0, 4.0, 4.0).to_rect();
        assert!(shape.intersection(&outside).is_none());
    }

    #[test]
    fn test_area_at_equator() {
        let projector = Projector::web_mercator().unwrap();
        let shape = Shape::Polygon(unit_square());
        let area = projector.area_km2(&shape).unwrap();
        // one degree of longitude at the equator is ~111.32 km
        assert!((area - 12_392.8).abs() / 12_392.8 < 0.01, "area = {area}");
        assert!(projector.area_below(&shape, 20_000.0).unwrap());
        assert!(!projector.area_below(&shape, 10_000.0).unwrap());
    }

    #[test]
    fn test_unproject_round_trip() {
        let projector = Projector::web_mercator().unwrap();
        let coord = Coord { x: -0.1276, y: 51.5072 };
        let back = projector
            .unproject_coord(projector.project_coord(coord).unwrap())
            .unwrap();
        assert!((back.x - coord.x).abs() < 1e-9);
        assert!((back.y - coord.y).abs() < 1e-9);
    }

    #[test]
    fn test_area_of_empty_shape_fails() {
        let projector = Projector::web_mercator().unwrap();
        let empty = Shape::MultiPolygon(MultiPolygon(vec![]));
        assert!(matches!(projector.area_km2(&empty), Err(Error::EmptyGeometry)));
    }
}
