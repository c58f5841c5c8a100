use std::fmt;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Error, Result};

enum Storage {
    Heap(Box<[u8]>),
    Mapped(Mmap),
}

/// Immutable bytes backing one loaded database.
///
/// Either a heap buffer filled by the owner during the build step, or a
/// read-only mapping of the database file itself.
pub struct Region {
    name: String,
    storage: Storage,
}

impl Region {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            storage: Storage::Heap(bytes.into_boxed_slice()),
        }
    }

    /// Map `path` read-only.
    pub fn map_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        let name = name.into();
        let file = File::open(path).map_err(|source| Error::FileNotOpenable {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the mapping is read-only. Address Library files are not
        // rewritten while the host process runs.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::SharedRegionCreationFailed {
            name: name.clone(),
            message: format!("{} ({})", e, path.display()),
        })?;

        Ok(Self {
            name,
            storage: Storage::Mapped(mmap),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Heap(bytes) => bytes,
            Storage::Mapped(mmap) => mmap,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped(_))
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}
