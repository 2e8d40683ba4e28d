pub mod analyze;
pub mod model;

// Re-export commonly used types/functions for consumers
pub use analyze::{analyze, Edge, EdgeKind, Report};
pub use model::{load_raw_bin, Image};
