//! Geometry preparation: splitting, simplification and query encoding.

pub mod encode;
pub mod simplify;
pub mod split;

pub use encode::encode;
pub use simplify::Simplifier;
pub use split::Decomposer;
