//! Overpass `poly:` coordinate fragments.

use geo::{Area, Polygon};

use crate::error::{Error, Result};
use crate::geo_core::Shape;

/// Decimal places kept per coordinate.
pub const COORDINATE_DECIMALS: i32 = 4;

/// Encode the exterior ring of a shape as `"lat lon lat lon ..."`.
///
/// Only the largest polygon of a multi-part shape is kept, holes are dropped
/// and the closing vertex is omitted (Overpass closes the ring itself).
pub fn encode(shape: &Shape) -> Result<String> {
    let polygon = dominant_polygon(shape).ok_or(Error::EmptyGeometry)?;
    let ring = &polygon.exterior().0;
    let open = match ring.split_last() {
        Some((last, rest)) if !rest.is_empty() && rest[0] == *last => rest,
        _ => ring.as_slice(),
    };
    if open.is_empty() {
        return Err(Error::EmptyGeometry);
    }

    let fragment = open
        .iter()
        .flat_map(|coord| [coord.y, coord.x])
        .map(format_coordinate)
        .collect::<Vec<_>>()
        .join(" ");
    Ok(fragment)
}

/// Largest polygon by area. Ties keep the earliest one.
pub fn dominant_polygon(shape: &Shape) -> Option<&Polygon<f64>> {
    shape.polygons().iter().reduce(|best, candidate| {
        if candidate.unsigned_area() > best.unsigned_area() {
            candidate
        } else {
            best
        }
    })
}

/// Round to four decimals and print with at least one fractional digit ("1.0", "51.5074").
pub fn format_coordinate(value: f64) -> String {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    let rounded = (value * scale).round() / scale;
    format!("{rounded:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString, MultiPolygon};

    #[test]
    fn test_encode_unit_square() {
        let shape = Shape::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]);
        assert_eq!(encode(&shape).unwrap(), "0.0 0.0 1.0 0.0 1.0 1.0 0.0 1.0");
    }

    #[test]
    fn test_encode_swaps_and_rounds() {
        let shape = Shape::Polygon(polygon![
            (x: -0.127_649_9, y: 51.507_351_2),
            (x: -0.1, y: 51.507_351_2),
            (x: -0.1, y: 51.52),
        ]);
        let fragment = encode(&shape).unwrap();
        assert_eq!(fragment, "51.5074 -0.1276 51.5074 -0.1 51.52 -0.1");

        // parse the fragment back into (lat, lon) pairs
        let values: Vec<f64> = fragment.split(' ').map(|v| v.parse().unwrap()).collect();
        let pairs: Vec<(f64, f64)> = values.chunks(2).map(|c| (c[0], c[1])).collect();
        assert_eq!(pairs, vec![(51.5074, -0.1276), (51.5074, -0.1), (51.52, -0.1)]);
    }

    #[test]
    fn test_holes_are_dropped() {
        let exterior = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0)]);
        let shape = Shape::Polygon(Polygon::new(exterior, vec![hole]));
        assert_eq!(encode(&shape).unwrap(), "0.0 0.0 0.0 4.0 4.0 4.0 4.0 0.0");
    }

    #[test]
    fn test_multipolygon_uses_largest_part() {
        let small = polygon![(x: 10.0, y: 10.0), (x: 11.0, y: 10.0), (x: 11.0, y: 11.0)];
        let large = polygon![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 3.0), (x: 0.0, y: 3.0)];
        let multi = Shape::MultiPolygon(MultiPolygon(vec![small, large.clone()]));

        assert_eq!(encode(&multi).unwrap(), encode(&Shape::Polygon(large)).unwrap());
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(0.0), "0.0");
        assert_eq!(format_coordinate(2.0), "2.0");
        assert_eq!(format_coordinate(4.352_47), "4.3525");
        assert_eq!(format_coordinate(-73.985_66), "-73.9857");
        assert_eq!(format_coordinate(0.0001), "0.0001");
    }

    #[test]
    fn test_empty_shape_fails() {
        let shape = Shape::MultiPolygon(MultiPolygon(vec![]));
        assert!(matches!(encode(&shape), Err(Error::EmptyGeometry)));
    }
}
