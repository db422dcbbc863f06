//! Road and cycling infrastructure length inside arbitrary boundaries.
//!
//! A boundary is split into pieces small enough for the Overpass API
//! ([`geometric::split`]), each piece is simplified until its text is short enough
//! ([`geometric::simplify`]) and encoded as a `poly:` fragment ([`geometric::encode`]).
//! One query per piece returns the summed way length per [`collect::overpass::filters`]
//! entry; [`measure`] adds them up per boundary and [`batch`] runs many boundaries.

pub mod batch;
pub mod collect;
pub mod commons;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod measure;
pub mod settings;

pub use error::{Error, Result};
pub use geo_core::{BoundingBox, Projector, Shape};
pub use measure::{LengthSource, MeasureOptions, Measurer, ResultRow};
pub use settings::Settings;
