//! Bank slips: batch generation, fees, settlement and listing

pub mod batch;
pub mod desk;
pub mod fees;
pub mod listing;
pub mod payment;

pub use batch::*;
pub use desk::*;
pub use fees::*;
pub use listing::*;
pub use payment::*;
