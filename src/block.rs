//! Shared block-sized constants and little-endian byte helpers.
//!
//! The on-disk format is explicitly little-endian regardless of host
//! byte order, so every multi-byte field goes through these helpers
//! rather than a raw struct reinterpretation.

/// Size in bytes of a single unit of disk I/O.
pub const BLOCK_SIZE: usize = 4096;

/// The raw contents of one block.
pub type Block = [u8; BLOCK_SIZE];

/// Returns a block filled with zero bytes.
pub fn zeroed() -> Block {
    [0u8; BLOCK_SIZE]
}

/// Reads a little-endian `u32` at byte offset `off` of `buf`.
pub fn get_u32(buf: &[u8], off: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[off..off + 4]);
    u32::from_le_bytes(bytes)
}

/// Writes `val` as a little-endian `u32` at byte offset `off` of `buf`.
pub fn put_u32(buf: &mut [u8], off: usize, val: u32) {
    buf[off..off + 4].copy_from_slice(&val.to_le_bytes());
}
