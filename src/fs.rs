//! Control operations and the byte-range read/write engine tying the
//! superblock, inode table, free-space bitmap and disk together.

use std::io::Write as IoWrite;

use crate::bitmap::Bitmap;
use crate::block::{zeroed, Block, BLOCK_SIZE};
use crate::disk::Disk;
use crate::error::{Error, Result};
use crate::inode::{self, Inode, DIRECT_POINTERS, POINTERS_PER_BLOCK};
use crate::superblock::Superblock;

/// A mounted filesystem: owns its [`Disk`] and the metadata cached and
/// derived from it at mount time.
///
/// Bound to a single thread of control for its whole lifetime: every
/// mutating method takes `&mut self`, so the borrow checker, not a
/// runtime lock, prevents concurrent use.
pub struct FileSystem<D: Disk> {
    disk: D,
    blocks: u32,
    inode_blocks: u32,
    #[allow(dead_code)]
    inodes: u32,
    bitmap: Bitmap,
}

impl<D: Disk> FileSystem<D> {
    /// Initializes an unmounted disk: writes a fresh superblock sized to
    /// `disk.size()` and zeroes every other block.
    ///
    /// Fails with [`Error::NotMountable`] if `disk` is already mounted.
    /// As in the reference design, this destroys any data already on
    /// the disk, including valid-looking inodes.
    pub fn format(disk: &mut D) -> Result<()> {
        if disk.mounted() {
            return Err(Error::NotMountable);
        }
        let sb = Superblock::compute(disk.size());
        disk.write(0, &sb.to_block())?;
        let zero = zeroed();
        for b in 1..sb.blocks {
            disk.write(b, &zero)?;
        }
        Ok(())
    }

    /// Validates the superblock on `disk` against its actual geometry,
    /// binds to it, and rebuilds the free-block bitmap by scanning
    /// every valid inode and its indirect block.
    ///
    /// Fails with [`Error::NotMountable`] if `disk` is already mounted
    /// or the on-disk superblock does not match `disk.size()`.
    pub fn mount(mut disk: D) -> Result<Self> {
        if disk.mounted() {
            return Err(Error::NotMountable);
        }
        let mut block = zeroed();
        disk.read(0, &mut block)?;
        let sb = Superblock::from_block(&block);
        if !sb.matches(disk.size()) {
            return Err(Error::NotMountable);
        }

        disk.mount();

        let mut bitmap = Bitmap::new(sb.blocks);
        bitmap.mark_used(0);
        for b in 1..=sb.inode_blocks {
            bitmap.mark_used(b);
            let mut inode_block = zeroed();
            disk.read(b, &mut inode_block)?;
            for slot in 0..crate::superblock::INODES_PER_BLOCK as usize {
                let node = Inode::decode(&inode_block, slot);
                if !node.valid {
                    continue;
                }
                for &ptr in &node.direct {
                    if ptr != 0 {
                        bitmap.mark_used(ptr);
                    }
                }
                if node.indirect != 0 {
                    bitmap.mark_used(node.indirect);
                    let mut ptr_block = zeroed();
                    disk.read(node.indirect, &mut ptr_block)?;
                    for i in 0..POINTERS_PER_BLOCK {
                        let ptr = inode::get_pointer(&ptr_block, i);
                        if ptr != 0 {
                            bitmap.mark_used(ptr);
                        }
                    }
                }
            }
        }

        Ok(Self {
            disk,
            blocks: sb.blocks,
            inode_blocks: sb.inode_blocks,
            inodes: sb.inodes,
            bitmap,
        })
    }

    /// Reads the block holding inode `n` and copies out its record.
    fn load(&mut self, n: u32) -> Result<Inode> {
        let (block_num, slot) = inode::locate(n);
        let mut block = zeroed();
        self.disk.read(block_num, &mut block)?;
        let node = Inode::decode(&block, slot);
        if !node.valid {
            return Err(Error::InvalidInode(n));
        }
        Ok(node)
    }

    /// Reads the block holding inode `n`, overwrites its slot with
    /// `node`, and writes the block back. Fails if the slot was not
    /// already valid, so `save` can never resurrect a removed inode.
    fn save(&mut self, n: u32, node: &Inode) -> Result<()> {
        let (block_num, slot) = inode::locate(n);
        let mut block = zeroed();
        self.disk.read(block_num, &mut block)?;
        if !Inode::decode(&block, slot).valid {
            return Err(Error::InvalidInode(n));
        }
        node.encode_into(&mut block, slot);
        self.disk.write(block_num, &block)?;
        Ok(())
    }

    /// Allocates the first free inode slot (block-major, slot-minor
    /// order), returning its *absolute* inode number
    /// `block_index * 128 + slot`.
    ///
    /// This corrects the aliasing bug in the distilled reference, which
    /// returns only `slot % 128` and so confuses inodes living in
    /// different inode blocks; see DESIGN.md.
    pub fn create(&mut self) -> Result<u32> {
        for b in 1..=self.inode_blocks {
            let mut block = zeroed();
            self.disk.read(b, &mut block)?;
            for slot in 0..crate::superblock::INODES_PER_BLOCK as usize {
                if Inode::decode(&block, slot).valid {
                    continue;
                }
                let node = Inode {
                    valid: true,
                    ..Default::default()
                };
                node.encode_into(&mut block, slot);
                self.disk.write(b, &block)?;
                return Ok((b - 1) * crate::superblock::INODES_PER_BLOCK + slot as u32);
            }
        }
        Err(Error::Exhausted)
    }

    /// Frees every block reachable from inode `n` (direct, indirect
    /// pointer block, and the blocks it points to), then marks the
    /// inode itself free.
    pub fn remove(&mut self, n: u32) -> Result<()> {
        let mut node = self.load(n)?;

        for ptr in node.direct.iter_mut() {
            if *ptr != 0 {
                self.free_block(*ptr);
                *ptr = 0;
            }
        }

        if node.indirect != 0 {
            let mut ptr_block = zeroed();
            self.disk.read(node.indirect, &mut ptr_block)?;
            for i in 0..POINTERS_PER_BLOCK {
                let ptr = inode::get_pointer(&ptr_block, i);
                if ptr != 0 {
                    self.free_block(ptr);
                }
            }
            self.free_block(node.indirect);
            node.indirect = 0;
        }

        node.valid = false;
        node.size = 0;
        self.save(n, &node)
    }

    /// Returns the logical size in bytes of inode `n`.
    pub fn stat(&mut self, n: u32) -> Result<u32> {
        self.load(n).map(|node| node.size)
    }

    /// Reads up to `buf.len()` bytes of inode `n`'s content starting at
    /// `offset`, clamped to the inode's current size. Returns the
    /// number of bytes actually copied.
    pub fn read(&mut self, n: u32, buf: &mut [u8], offset: u32) -> Result<usize> {
        let node = self.load(n)?;

        if offset > node.size {
            return Err(Error::OutOfRange);
        }
        let mut remaining = (buf.len() as u32).min(node.size - offset) as usize;

        let mut dst_cursor = 0usize;
        let mut block_idx = (offset / BLOCK_SIZE as u32) as usize;
        let mut byte_off = (offset % BLOCK_SIZE as u32) as usize;

        let mut block = zeroed();

        while block_idx < DIRECT_POINTERS && remaining > 0 {
            self.disk.read(node.direct[block_idx], &mut block)?;
            let copy_len = remaining.min(BLOCK_SIZE - byte_off);
            buf[dst_cursor..dst_cursor + copy_len]
                .copy_from_slice(&block[byte_off..byte_off + copy_len]);
            dst_cursor += copy_len;
            remaining -= copy_len;
            byte_off = 0;
            block_idx += 1;
        }

        if remaining > 0 {
            if node.indirect == 0 {
                return Err(Error::InvalidInode(n));
            }
            let mut ptr_block = zeroed();
            self.disk.read(node.indirect, &mut ptr_block)?;
            let mut p = block_idx - DIRECT_POINTERS;
            while p < POINTERS_PER_BLOCK && remaining > 0 {
                let data_block_num = inode::get_pointer(&ptr_block, p);
                self.disk.read(data_block_num, &mut block)?;
                let copy_len = remaining.min(BLOCK_SIZE - byte_off);
                buf[dst_cursor..dst_cursor + copy_len]
                    .copy_from_slice(&block[byte_off..byte_off + copy_len]);
                dst_cursor += copy_len;
                remaining -= copy_len;
                byte_off = 0;
                p += 1;
            }
        }

        Ok(dst_cursor)
    }

    /// Writes `buf` into inode `n`'s content starting at `offset`,
    /// allocating data blocks (and an indirect pointer block, as
    /// needed) lazily. Unlike `read`, does not clamp against the
    /// inode's current size: a write may extend it.
    ///
    /// If allocation fails partway through, the write does not error:
    /// it commits everything written so far, extends `Size` by that
    /// amount, and returns `Ok(written)`. This is the one place
    /// `NoSpace` from the abstract error list actually shows up, and
    /// it never becomes an `Err`.
    pub fn write(&mut self, n: u32, buf: &[u8], offset: u32) -> Result<usize> {
        let mut node = self.load(n)?;

        let mut remaining = buf.len();
        let mut src_cursor = 0usize;
        let mut block_idx = (offset / BLOCK_SIZE as u32) as usize;
        let mut byte_off = (offset % BLOCK_SIZE as u32) as usize;
        let mut written = 0usize;

        while block_idx < DIRECT_POINTERS && remaining > 0 {
            if node.direct[block_idx] == 0 {
                let Some(new_block) = self.bitmap.allocate() else {
                    node.size += written as u32;
                    self.save(n, &node)?;
                    return Ok(written);
                };
                node.direct[block_idx] = new_block;
            }

            let mut block = self.read_or_zero(node.direct[block_idx], byte_off)?;
            let copy_len = remaining.min(BLOCK_SIZE - byte_off);
            block[byte_off..byte_off + copy_len]
                .copy_from_slice(&buf[src_cursor..src_cursor + copy_len]);
            self.disk.write(node.direct[block_idx], &block)?;

            src_cursor += copy_len;
            remaining -= copy_len;
            written += copy_len;
            byte_off = 0;
            block_idx += 1;
        }

        if remaining > 0 {
            if node.indirect == 0 {
                let Some(new_block) = self.bitmap.allocate() else {
                    node.size += written as u32;
                    self.save(n, &node)?;
                    return Ok(written);
                };
                node.indirect = new_block;
                self.disk.write(node.indirect, &zeroed())?;
            }

            let mut ptr_block = zeroed();
            self.disk.read(node.indirect, &mut ptr_block)?;
            let mut p = block_idx - DIRECT_POINTERS;

            while p < POINTERS_PER_BLOCK && remaining > 0 {
                let mut target = inode::get_pointer(&ptr_block, p);
                if target == 0 {
                    let Some(new_block) = self.bitmap.allocate() else {
                        self.disk.write(node.indirect, &ptr_block)?;
                        node.size += written as u32;
                        self.save(n, &node)?;
                        return Ok(written);
                    };
                    target = new_block;
                    inode::put_pointer(&mut ptr_block, p, target);
                }

                let mut block = self.read_or_zero(target, byte_off)?;
                let copy_len = remaining.min(BLOCK_SIZE - byte_off);
                block[byte_off..byte_off + copy_len]
                    .copy_from_slice(&buf[src_cursor..src_cursor + copy_len]);
                self.disk.write(target, &block)?;

                src_cursor += copy_len;
                remaining -= copy_len;
                written += copy_len;
                byte_off = 0;
                p += 1;
            }

            self.disk.write(node.indirect, &ptr_block)?;
        }

        node.size += written as u32;
        self.save(n, &node)?;
        Ok(written)
    }

    /// Reads `block_num` when the write will only overwrite part of it
    /// (`byte_off > 0`, so the head must be preserved); otherwise
    /// returns a freshly zeroed buffer so no stale data leaks into a
    /// newly allocated block.
    fn read_or_zero(&mut self, block_num: u32, byte_off: usize) -> Result<Block> {
        if byte_off == 0 {
            return Ok(zeroed());
        }
        let mut block = zeroed();
        self.disk.read(block_num, &mut block)?;
        Ok(block)
    }

    /// Marks `b` free in the bitmap and zeroes its on-disk contents.
    fn free_block(&mut self, b: u32) {
        self.bitmap.free(b);
        let _ = self.disk.write(b, &zeroed());
    }

    /// Writes a human-readable dump of the superblock and every valid
    /// inode to `out`, in the fixed content this module's docs specify.
    pub fn debug(&mut self, out: &mut impl IoWrite) -> Result<()> {
        let mut sb_block = zeroed();
        self.disk.read(0, &mut sb_block)?;
        let sb = Superblock::from_block(&sb_block);

        writeln!(out, "SuperBlock:")?;
        if sb.magic_number == crate::superblock::MAGIC_NUMBER {
            writeln!(out, "    magic number is valid")?;
        } else {
            writeln!(out, "    magic number is invalid")?;
        }
        writeln!(out, "    {} blocks", sb.blocks)?;
        writeln!(out, "    {} inode blocks", sb.inode_blocks)?;
        writeln!(out, "    {} inodes", sb.inodes)?;

        for b in 1..=sb.inode_blocks {
            let mut block = zeroed();
            self.disk.read(b, &mut block)?;
            for slot in 0..crate::superblock::INODES_PER_BLOCK as usize {
                let node = Inode::decode(&block, slot);
                if !node.valid {
                    continue;
                }
                let n = (b - 1) * crate::superblock::INODES_PER_BLOCK + slot as u32;
                writeln!(out, "Inode {n}:")?;
                writeln!(out, "    size: {} bytes", node.size)?;
                write!(out, "    direct blocks:")?;
                for ptr in node.direct.iter().filter(|&&p| p > 0) {
                    write!(out, " {ptr}")?;
                }
                writeln!(out)?;
                if node.indirect != 0 {
                    writeln!(out, "    indirect block: {}", node.indirect)?;
                    let mut ptr_block = zeroed();
                    self.disk.read(node.indirect, &mut ptr_block)?;
                    write!(out, "    indirect data blocks:")?;
                    for i in 0..POINTERS_PER_BLOCK {
                        let ptr = inode::get_pointer(&ptr_block, i);
                        if ptr > 0 {
                            write!(out, " {ptr}")?;
                        }
                    }
                    writeln!(out)?;
                }
            }
        }

        Ok(())
    }

    /// Total number of blocks on the mounted disk.
    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Number of blocks reserved for the inode table.
    pub fn inode_blocks(&self) -> u32 {
        self.inode_blocks
    }
}
