//! The inode record and its placement within an inode block.

use crate::block::{get_u32, put_u32, Block};
use crate::superblock::INODES_PER_BLOCK;

/// Number of direct block pointers an inode carries.
pub const DIRECT_POINTERS: usize = 5;

/// Number of 32-bit pointers a pointer (indirect) block holds.
pub const POINTERS_PER_BLOCK: usize = 1024;

/// Size in bytes of one inode record on disk.
pub const INODE_SIZE: usize = 32;

/// Bytes addressable through the direct pointers alone.
pub const DIRECT_REGION: u32 = (DIRECT_POINTERS * crate::block::BLOCK_SIZE) as u32;

/// Bytes addressable through the indirect pointer block.
pub const INDIRECT_REGION: u32 = (POINTERS_PER_BLOCK * crate::block::BLOCK_SIZE) as u32;

/// The largest file size this layout can address.
pub const MAX_FILE_SIZE: u32 = DIRECT_REGION + INDIRECT_REGION;

/// A single inode: validity flag, logical size, five direct block
/// pointers, and one indirect (pointer-block) pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inode {
    pub valid: bool,
    pub size: u32,
    pub direct: [u32; DIRECT_POINTERS],
    pub indirect: u32,
}

impl Inode {
    /// Decodes the inode stored in `block` at byte offset
    /// `slot * INODE_SIZE`.
    pub fn decode(block: &Block, slot: usize) -> Self {
        let off = slot * INODE_SIZE;
        let valid = get_u32(block, off) != 0;
        let size = get_u32(block, off + 4);
        let mut direct = [0u32; DIRECT_POINTERS];
        for (i, d) in direct.iter_mut().enumerate() {
            *d = get_u32(block, off + 8 + i * 4);
        }
        let indirect = get_u32(block, off + 8 + DIRECT_POINTERS * 4);
        Self {
            valid,
            size,
            direct,
            indirect,
        }
    }

    /// Encodes `self` into `block` at byte offset `slot * INODE_SIZE`,
    /// overwriting exactly that slot and leaving the rest of the block
    /// untouched.
    pub fn encode_into(&self, block: &mut Block, slot: usize) {
        let off = slot * INODE_SIZE;
        put_u32(block, off, self.valid as u32);
        put_u32(block, off + 4, self.size);
        for (i, d) in self.direct.iter().enumerate() {
            put_u32(block, off + 8 + i * 4, *d);
        }
        put_u32(block, off + 8 + DIRECT_POINTERS * 4, self.indirect);
    }
}

/// Splits an absolute inode number into the (disk-block, in-block slot)
/// pair described in the on-disk layout: inode blocks start at block 1.
pub fn locate(inumber: u32) -> (u32, usize) {
    let block = inumber / INODES_PER_BLOCK + 1;
    let slot = (inumber % INODES_PER_BLOCK) as usize;
    (block, slot)
}

/// Reads pointer `i` out of a decoded pointer block.
pub fn get_pointer(block: &Block, i: usize) -> u32 {
    get_u32(block, i * 4)
}

/// Writes pointer `i` into a pointer block.
pub fn put_pointer(block: &mut Block, i: usize, value: u32) {
    put_u32(block, i * 4, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_first_inode_of_each_block() {
        assert_eq!(locate(0), (1, 0));
        assert_eq!(locate(127), (1, 127));
        assert_eq!(locate(128), (2, 0));
        assert_eq!(locate(255), (2, 127));
    }

    #[test]
    fn inode_round_trip() {
        let inode = Inode {
            valid: true,
            size: 12345,
            direct: [1, 2, 3, 0, 0],
            indirect: 99,
        };
        let mut block = [0u8; crate::block::BLOCK_SIZE];
        inode.encode_into(&mut block, 5);
        let back = Inode::decode(&block, 5);
        assert_eq!(inode, back);

        // Untouched slots stay zeroed/invalid.
        let other = Inode::decode(&block, 6);
        assert!(!other.valid);
    }

    #[test]
    fn pointer_block_round_trip() {
        let mut block = [0u8; crate::block::BLOCK_SIZE];
        put_pointer(&mut block, 0, 7);
        put_pointer(&mut block, 1023, 42);
        assert_eq!(get_pointer(&block, 0), 7);
        assert_eq!(get_pointer(&block, 1023), 42);
        assert_eq!(get_pointer(&block, 512), 0);
    }

    #[test]
    fn max_file_size_matches_spec() {
        assert_eq!(DIRECT_REGION, 20_480);
        assert_eq!(INDIRECT_REGION, 4_194_304);
        assert_eq!(MAX_FILE_SIZE, 4_214_784);
    }
}
