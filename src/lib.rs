//! # Bursar Core
//!
//! School back-office finance: bulk registration of student financial data
//! and scholarships from CSV files, plus the bank slip workflow of batch
//! generation, late-fee assessment and settlement.
//!
//! ## Features
//!
//! - **Bulk imports**: CSV parsing and templates, one remote call per file, per-row results
//! - **Bank slips**: batch generation behind an all-or-nothing recipient gate, email delivery
//! - **Fees**: late fee and interest assessed fresh every time an amount is shown
//! - **Settlement**: payment recording with platform messages surfaced verbatim
//! - **Reports**: typed report requests mapped to platform RPCs
//! - **Platform abstraction**: every service receives its `FinancialPlatform` client
//!
//! ## Quick Start
//!
//! ```rust
//! use bursar_core::{BankSlipDesk, BatchForm, MemoryPlatform};
//!
//! let platform = MemoryPlatform::new();
//! let desk = BankSlipDesk::new(platform.clone());
//! let form = BatchForm {
//!     selected_students: vec!["3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f".to_string()],
//!     amount: "150,00".to_string(),
//!     due_date: "2025-05-10".to_string(),
//!     description: "May tuition".to_string(),
//! };
//! let request = form.into_request().unwrap();
//! assert_eq!(request.recipient_ids.len(), 1);
//! // desk.generate(&request).await returns the batch id
//! # let _ = desk;
//! ```

pub mod bulk;
pub mod config;
pub mod remote;
pub mod reports;
pub mod slips;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use bulk::*;
pub use config::PlatformConfig;
pub use remote::RestPlatform;
pub use reports::*;
pub use slips::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_platform::MemoryPlatform;
