//! Host process collaborators: the loaded executable and the runtime variant.

#[cfg(target_os = "windows")]
mod win32;

#[cfg(target_os = "windows")]
pub use win32::{CurrentModule, file_version};

use crate::version::Version;

/// The executable whose addresses are being resolved
pub trait HostModule {
    /// Load address of the executable image
    fn base(&self) -> usize;
    /// Version stamp of the executable
    fn version(&self) -> Version;
}

/// Decides which runtime variant the host is
pub trait RuntimeDetector {
    /// Index into candidate sets, or `None` if undetermined
    fn runtime_index(&self) -> Option<usize>;
}

/// Fixed host description, for tools and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHost {
    pub base: usize,
    pub version: Version,
}

impl StaticHost {
    pub fn new(base: usize, version: Version) -> Self {
        Self { base, version }
    }
}

impl HostModule for StaticHost {
    fn base(&self) -> usize {
        self.base
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// Runtime index known up front
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedRuntime(pub Option<usize>);

impl RuntimeDetector for FixedRuntime {
    fn runtime_index(&self) -> Option<usize> {
        self.0
    }
}

impl<F> RuntimeDetector for F
where
    F: Fn() -> Option<usize>,
{
    fn runtime_index(&self) -> Option<usize> {
        self()
    }
}
