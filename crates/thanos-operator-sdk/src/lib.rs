//! # Thanos Operator SDK
//!
//! Custom resource definitions, compiled-in defaults and the typed merge used
//! to complete partially specified components.

pub mod crds;
pub mod defaults;
pub mod merge;

pub use crds::*;
pub use defaults::*;
pub use merge::*;
