//! On-disk layout constants for Address Library files
//!
//! All multi-byte fields are little-endian.

/// Legacy v0 file: `u64 count` followed by `{u64 id, u64 offset}` pairs.
pub mod legacy {
    /// Size of the leading record count
    pub const COUNT_SIZE: usize = 8;
    /// Size of one `{id, offset}` record
    pub const RECORD_SIZE: usize = 16;
}

/// Compressed v1/v2 file header fields.
pub mod compressed {
    /// Leading `u32` format tag
    pub const TAG_SIZE: usize = 4;
    /// Names longer than this do not fit the fixed name buffer
    pub const MAX_NAME_LEN: usize = 63;
}

/// Dense v5 file: fixed 96-byte header followed by one `u32` offset per id.
pub mod dense {
    pub const TAG: usize = 0;
    pub const GAME_VERSION: usize = 4;
    pub const NAME: usize = 20;
    pub const NAME_SIZE: usize = 64;
    pub const POINTER_SIZE: usize = NAME + NAME_SIZE;
    pub const DATA_FORMAT: usize = POINTER_SIZE + 4;
    pub const OFFSET_COUNT: usize = DATA_FORMAT + 4;

    /// Total header size; the offset table starts here
    pub const HEADER_SIZE: usize = OFFSET_COUNT + 4;
    /// Size of one dense entry
    pub const ENTRY_SIZE: usize = 4;
}

/// Shared region naming
pub mod region {
    /// Default name prefix; the host version (`_`-joined) is appended
    pub const DEFAULT_PREFIX: &str = "ADDRLIB_IDDB_OFFSETS_";
}
