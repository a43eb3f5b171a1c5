//! Utility modules

pub mod memory_platform;
pub mod money;
pub mod validation;

pub use memory_platform::*;
pub use money::*;
pub use validation::*;
