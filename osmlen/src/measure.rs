use geo::Polygon;
use tracing::{debug, info};

use crate::collect::overpass::filters::InfrastructureFilter;
use crate::commons::basic_functions::ratio;
use crate::error::{Error, Result};
use crate::geo_core::{Projector, Shape};
use crate::geometric::{encode, Decomposer, Simplifier};

/// Anything that can sum way lengths per filter inside one encoded fragment.
///
/// Implementations return one value per filter, in filter order.
pub trait LengthSource {
    fn lengths(
        &mut self,
        fragment: &str,
        filters: &[InfrastructureFilter],
        date: Option<&str>,
    ) -> Result<Vec<f64>>;
}

/// Knobs of the geometry preparation.
#[derive(Debug, Clone, Copy)]
pub struct MeasureOptions {
    /// Pieces must have a projected area below this, in km².
    pub area_threshold_km2: f64,
    pub max_depth: usize,
    pub simplify: bool,
    /// Exclusive bound on the WKT length of each piece.
    pub simplify_limit: usize,
    pub max_simplify_passes: usize,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        MeasureOptions {
            area_threshold_km2: 1_000_000.0,
            max_depth: crate::geometric::split::MAX_DEPTH,
            simplify: true,
            simplify_limit: crate::geometric::simplify::DEFAULT_TEXT_LIMIT,
            max_simplify_passes: crate::geometric::simplify::DEFAULT_MAX_PASSES,
        }
    }
}

/// Outcome for one boundary (and one date in historic runs).
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub name: String,
    pub date: Option<String>,
    /// Length of the first filter (every road and path).
    pub road_length: f64,
    /// Sum of every other filter.
    pub cycle_length: f64,
    /// `cycle_length / road_length`, NaN without roads.
    pub ratio: f64,
    pub lengths: Vec<f64>,
}

impl ResultRow {
    pub fn from_lengths(name: &str, date: Option<&str>, lengths: Vec<f64>) -> Self {
        let road_length = lengths.first().copied().unwrap_or(0.0);
        let cycle_length: f64 = lengths.iter().skip(1).sum();
        ResultRow {
            name: name.to_string(),
            date: date.map(str::to_string),
            road_length,
            cycle_length,
            ratio: ratio(cycle_length, road_length),
            lengths,
        }
    }
}

/// Turns boundaries into query fragments and fragments into result rows.
pub struct Measurer {
    projector: Projector,
    options: MeasureOptions,
}

impl Measurer {
    pub fn new(options: MeasureOptions) -> Result<Self> {
        Ok(Measurer {
            projector: Projector::web_mercator()?,
            options,
        })
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Split a boundary into pieces below the area threshold.
    pub fn pieces(&self, shape: Shape) -> Result<Vec<Polygon<f64>>> {
        Decomposer::new(self.options.max_depth).decompose(
            shape,
            self.options.area_threshold_km2,
            |piece, limit| self.projector.area_below(piece, limit),
        )
    }

    /// Pieces, simplified when enabled, encoded as Overpass polygon fragments.
    pub fn fragments(&self, shape: Shape) -> Result<Vec<String>> {
        let simplifier = Simplifier::new(self.options.simplify_limit, self.options.max_simplify_passes);

        self.pieces(shape)?
            .into_iter()
            .map(|polygon| {
                let piece = Shape::Polygon(polygon);
                if self.options.simplify {
                    encode(&simplifier.simplify(&piece)?)
                } else {
                    encode(&piece)
                }
            })
            .collect()
    }

    /// Query every fragment and add the results per filter.
    pub fn sum_lengths<S: LengthSource + ?Sized>(
        fragments: &[String],
        source: &mut S,
        filters: &[InfrastructureFilter],
        date: Option<&str>,
    ) -> Result<Vec<f64>> {
        let mut totals = vec![0.0; filters.len()];
        for (index, fragment) in fragments.iter().enumerate() {
            let lengths = source.lengths(fragment, filters, date)?;
            if lengths.len() != filters.len() {
                return Err(Error::ResultCount {
                    expected: filters.len(),
                    got: lengths.len(),
                });
            }
            debug!(piece = index + 1, of = fragments.len(), ?lengths, "piece measured");
            for (total, length) in totals.iter_mut().zip(lengths) {
                *total += length;
            }
        }
        Ok(totals)
    }

    /// Measure one boundary end to end.
    pub fn measure<S: LengthSource + ?Sized>(
        &self,
        name: &str,
        date: Option<&str>,
        shape: Shape,
        source: &mut S,
        filters: &[InfrastructureFilter],
    ) -> Result<ResultRow> {
        let fragments = self.fragments(shape)?;
        info!(name, pieces = fragments.len(), "boundary prepared");
        let totals = Self::sum_lengths(&fragments, source, filters, date)?;
        Ok(ResultRow::from_lengths(name, date, totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::overpass::filters::INFRASTRUCTURE_FILTERS;
    use geo::{Coord, LineString};

    /// Returns the same lengths for every fragment and remembers what it was asked.
    struct StubSource {
        response: Vec<f64>,
        calls: Vec<(String, Option<String>)>,
    }

    impl StubSource {
        fn new(response: Vec<f64>) -> Self {
            StubSource {
                response,
                calls: Vec::new(),
            }
        }
    }

    impl LengthSource for StubSource {
        fn lengths(
            &mut self,
            fragment: &str,
            _filters: &[InfrastructureFilter],
            date: Option<&str>,
        ) -> Result<Vec<f64>> {
            self.calls.push((fragment.to_string(), date.map(str::to_string)));
            Ok(self.response.clone())
        }
    }

    /// Square of `side_m` metres in web mercator, anchored at lon/lat (0, 0).
    fn metric_square(projector: &Projector, side_m: f64) -> Shape {
        let corners = [(0.0, 0.0), (side_m, 0.0), (side_m, side_m), (0.0, side_m)];
        let coords: Vec<Coord<f64>> = corners
            .iter()
            .map(|&(x, y)| projector.unproject_coord(Coord { x, y }).unwrap())
            .collect();
        Shape::Polygon(Polygon::new(LineString(coords), vec![]))
    }

    fn options(area_threshold_km2: f64) -> MeasureOptions {
        MeasureOptions {
            area_threshold_km2,
            ..Default::default()
        }
    }

    #[test]
    fn test_six_km_square_gives_four_pieces() {
        let measurer = Measurer::new(options(9.0)).unwrap();
        // just under 6 km a side, so quarters land just under 9 km²
        let shape = metric_square(measurer.projector(), 5_999.0);
        assert!(measurer.projector().area_km2(&shape).unwrap() > 35.9);

        let pieces = measurer.pieces(shape.clone()).unwrap();
        assert_eq!(pieces.len(), 4);
        let total: f64 = pieces
            .into_iter()
            .map(|p| measurer.projector().area_km2(&Shape::Polygon(p)).unwrap())
            .sum();
        let whole = measurer.projector().area_km2(&shape).unwrap();
        assert!((total - whole).abs() / whole < 1e-6);

        let mut source = StubSource::new(vec![10.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let row = measurer
            .measure("Square", None, shape, &mut source, &INFRASTRUCTURE_FILTERS)
            .unwrap();
        assert_eq!(source.calls.len(), 4);
        assert_eq!(row.road_length, 40.0);
        assert_eq!(row.cycle_length, 12.0);
        assert!((row.ratio - 0.3).abs() < 1e-12);
        assert_eq!(row.lengths.len(), 8);
    }

    #[test]
    fn test_small_boundary_is_one_piece() {
        let measurer = Measurer::new(MeasureOptions::default()).unwrap();
        let shape = metric_square(measurer.projector(), 1_000.0);
        let fragments = measurer.fragments(shape).unwrap();
        assert_eq!(fragments.len(), 1);
        // four corners, lat lon each
        assert_eq!(fragments[0].split(' ').count(), 8);
    }

    #[test]
    fn test_date_is_passed_through() {
        let measurer = Measurer::new(MeasureOptions::default()).unwrap();
        let shape = metric_square(measurer.projector(), 1_000.0);
        let mut source = StubSource::new(vec![5.0; 8]);
        let row = measurer
            .measure("Square", Some("2015-03-01T00:00:00Z"), shape, &mut source, &INFRASTRUCTURE_FILTERS)
            .unwrap();
        assert_eq!(row.date.as_deref(), Some("2015-03-01T00:00:00Z"));
        assert_eq!(source.calls[0].1.as_deref(), Some("2015-03-01T00:00:00Z"));
    }

    #[test]
    fn test_zero_road_length_gives_nan_ratio() {
        let row = ResultRow::from_lengths("Empty", None, vec![0.0; 8]);
        assert_eq!(row.road_length, 0.0);
        assert!(row.ratio.is_nan());
    }

    #[test]
    fn test_wrong_result_count_is_rejected() {
        let mut source = StubSource::new(vec![1.0, 2.0]);
        let fragments = vec!["0.0 0.0 1.0 0.0 1.0 1.0".to_string()];
        let err = Measurer::sum_lengths(&fragments, &mut source, &INFRASTRUCTURE_FILTERS, None).unwrap_err();
        assert!(matches!(err, Error::ResultCount { expected: 8, got: 2 }));
    }
}
