pub mod mode;
pub mod snapshot;

pub use mode::*;
pub use snapshot::*;
