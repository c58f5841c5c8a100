use crate::database::AddressDatabase;
use crate::error::{Error, Result};

/// One raw id per runtime variant; zero marks "use the fallback".
///
/// ```
/// use addrlib_core::relocation::CandidateSet;
///
/// const PLAYER_CTOR: CandidateSet<3> = CandidateSet::triple(12345, 67890, 0);
/// assert_eq!(PLAYER_CTOR.resolve(Some(2)), 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateSet<const N: usize> {
    ids: [u64; N],
}

/// Single-runtime id
pub type Id = CandidateSet<1>;

impl<const N: usize> CandidateSet<N> {
    pub const fn new(ids: [u64; N]) -> Self {
        Self { ids }
    }

    /// Id as written for runtime `index`, before any fallback; zero if out of range
    pub fn raw(&self, index: usize) -> u64 {
        self.ids.get(index).copied().unwrap_or(0)
    }

    /// Whether runtime `index` has its own id
    pub fn has_explicit(&self, index: usize) -> bool {
        self.raw(index) != 0
    }

    pub fn ids(&self) -> &[u64; N] {
        &self.ids
    }

    /// Id to use for runtime `index`.
    ///
    /// An unknown or out-of-range index takes the first nonzero id. A zero slot
    /// takes slot 0 if that is set, then the first nonzero id. Zero means no
    /// slot is set at all.
    pub fn resolve(&self, index: Option<usize>) -> u64 {
        let Some(index) = index.filter(|&i| i < N) else {
            return self.resolve_fallback();
        };

        match self.ids[index] {
            0 => match self.ids.first() {
                Some(&primary) if index > 0 && primary != 0 => primary,
                _ => self.resolve_fallback(),
            },
            id => id,
        }
    }

    /// First nonzero id in slot order
    pub fn resolve_fallback(&self) -> u64 {
        self.ids.iter().copied().find(|&id| id != 0).unwrap_or(0)
    }

    /// Offset of the id resolved for runtime `index`.
    ///
    /// A set with no id at all fails with [`Error::IdNotFound`] for id 0.
    pub fn offset(&self, db: &AddressDatabase, index: Option<usize>) -> Result<u64> {
        db.offset(self.checked(db, index)?)
    }

    pub fn address(&self, db: &AddressDatabase, base: usize, index: Option<usize>) -> Result<usize> {
        db.address(self.checked(db, index)?, base)
    }

    fn checked(&self, db: &AddressDatabase, index: Option<usize>) -> Result<u64> {
        match self.resolve(index) {
            0 => Err(Error::IdNotFound {
                id: 0,
                version: db.version(),
            }),
            id => Ok(id),
        }
    }
}

impl CandidateSet<1> {
    pub const fn single(id: u64) -> Self {
        Self::new([id])
    }
}

impl CandidateSet<2> {
    pub const fn pair(first: u64, second: u64) -> Self {
        Self::new([first, second])
    }
}

impl CandidateSet<3> {
    pub const fn triple(first: u64, second: u64, third: u64) -> Self {
        Self::new([first, second, third])
    }

    /// Two ids for a three-runtime build; the third runtime shares the first id.
    pub const fn with_shared_primary(first: u64, second: u64) -> Self {
        Self::new([first, second, first])
    }
}

impl CandidateSet<4> {
    pub const fn quad(first: u64, second: u64, third: u64, fourth: u64) -> Self {
        Self::new([first, second, third, fourth])
    }

    /// Two ids for a four-runtime build; the last two runtimes fall back to the first.
    pub const fn with_primary_pair(first: u64, second: u64) -> Self {
        Self::new([first, second, 0, 0])
    }
}

impl From<u64> for CandidateSet<1> {
    fn from(id: u64) -> Self {
        Self::single(id)
    }
}
