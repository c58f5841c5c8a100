//! # addrlib-core
//!
//! Core library for resolving Address Library ids to offsets in a host executable.
//!
//! This crate provides:
//! - Readers and writers for the legacy (v0), compressed (v1/v2), dense (v5) and CSV formats
//! - A process-wide cache that decodes each database once and shares it between callers
//! - Database discovery per script extender loader and known-bad snapshot detection
//! - Runtime-variant id selection (`CandidateSet`) and address computation
//!
//! ## Platform support
//!
//! Everything except [`host::CurrentModule`] is platform independent; that type
//! reads the running executable through the Win32 API and only exists on Windows.

pub mod config;
pub mod database;
pub mod error;
pub mod host;
pub mod prelude;
pub mod relocation;
pub mod shared;
pub mod version;

pub use config::{DatabaseConfig, DatabaseConfigBuilder};
pub use database::{
    AddressDatabase, Blacklist, BlacklistEntry, CsvDatabase, CsvStats, DatabaseSource,
    DeltaEncoder, Format, Header, Loader, OffsetIndex, Record, RecordStore, SourceKind,
    StoreLayout, content_hash, locate, read_csv, write_compressed, write_csv, write_dense,
    write_legacy,
};
pub use error::{Error, Result};
#[cfg(target_os = "windows")]
pub use host::CurrentModule;
pub use host::{FixedRuntime, HostModule, RuntimeDetector, StaticHost};
pub use relocation::{CandidateSet, Id, Relocator, relocate, relocate3};
pub use shared::{Region, SharedCache};
pub use version::Version;
