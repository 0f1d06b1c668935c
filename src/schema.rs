//! Storage layout constants for SQLFS
//!
//! The relational schema itself lives in `migrations/`. Three relations carry
//! the whole filesystem: `inodes` (one JSON document per inode), `tree`
//! (parent/name edges) and `data_blocks` (fixed-size content chunks).

/// File type constants for mode field
pub mod mode {
    pub const S_IFMT: u32 = 0o170000; // File type mask
    pub const S_IFSOCK: u32 = 0o140000; // Socket
    pub const S_IFLNK: u32 = 0o120000; // Symbolic link
    pub const S_IFREG: u32 = 0o100000; // Regular file
    pub const S_IFBLK: u32 = 0o060000; // Block device
    pub const S_IFDIR: u32 = 0o040000; // Directory
    pub const S_IFCHR: u32 = 0o020000; // Character device
    pub const S_IFIFO: u32 = 0o010000; // Named pipe

    /// Permission and set-id bits
    pub const PERM_MASK: u32 = 0o7777;

    // Default permissions
    pub const DEFAULT_DIR_PERM: u32 = 0o755; // rwxr-xr-x
    pub const SYMLINK_PERM: u32 = 0o755; // lrwxr-xr-x
}

/// Root inode number (always 1). Root never appears as a child in `tree`.
pub const ROOT_INO: i64 = 1;

/// Size of one `data_blocks` row, also reported as the filesystem block size.
///
/// Smaller blocks make whole-file reads and writes issue more statements.
pub const BLOCK_SIZE: usize = 1024;

/// Largest file size accepted by `write` and `setattr`. Content is
/// assembled in memory whole, so this also bounds a single allocation.
pub const MAX_FILE_SIZE: u64 = 1 << 30;

/// Maximum length of a single name component, in bytes.
pub const NAME_MAX: usize = 255;
