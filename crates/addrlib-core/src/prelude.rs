//! Prelude module for convenient imports
//!
//! ```ignore
//! use addrlib_core::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Loading: `AddressDatabase`, `DatabaseConfig`, `Loader`, `SharedCache`
//! - Relocation: `CandidateSet`, `Id`, `Relocator`
//! - Host: `HostModule`, `RuntimeDetector`, `Version`
//! - Error handling: `Error`, `Result`

// Loading
pub use crate::config::DatabaseConfig;
pub use crate::database::{AddressDatabase, Format, Loader};
pub use crate::shared::SharedCache;

// Error handling
pub use crate::error::{Error, Result};

// Relocation
pub use crate::relocation::{CandidateSet, Id, Relocator};

// Host collaborators
pub use crate::host::{HostModule, RuntimeDetector};
pub use crate::version::Version;
