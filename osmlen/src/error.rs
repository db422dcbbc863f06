/// Error types for geometry preparation and length collection
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("geometry is empty")]
    EmptyGeometry,

    #[error("expected a Polygon or MultiPolygon, got {0}")]
    NotPolygonal(&'static str),

    #[error("invalid WKT: {0}")]
    InvalidWkt(String),

    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("projection failed: {0}")]
    Projection(String),

    #[error("could not simplify below {limit} characters after {passes} passes (last length {length})")]
    SimplificationNonConvergence {
        limit: usize,
        passes: usize,
        length: usize,
    },

    #[error("statistics service failed after {attempts} attempts: {message}")]
    Transport { attempts: usize, message: String },

    #[error("statistics service returned {got} values for {expected} filters")]
    ResultCount { expected: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for invalid, empty or non-polygonal input geometry.
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Error::EmptyGeometry
                | Error::NotPolygonal(_)
                | Error::InvalidWkt(_)
                | Error::InvalidGeoJson(_)
                | Error::Projection(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
