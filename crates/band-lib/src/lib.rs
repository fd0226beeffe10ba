pub mod acquire;
pub mod detectors;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod signal;

pub use acquire::*;
pub use detectors::*;
pub use metrics::*;
pub use signal::*;
