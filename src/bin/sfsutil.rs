//! `sfsutil`: a thin command-line front end over the `sfs` core.
//!
//! Each invocation opens (and for `format`, creates) a disk image file,
//! performs exactly one operation, and exits. This binary is
//! deliberately minimal — argument parsing and the shell dispatch loop
//! are not part of the filesystem core, only a convenience wrapper
//! around it, in the same manual-argument-parsing style the rest of
//! this toolbox uses (no argument-parsing crate).

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;

use sfs::disk::{FileDisk, MemDisk};
use sfs::fs::FileSystem;

/// Writes an error to stderr, then exits with status 1.
fn error<M: fmt::Display>(msg: M) -> ! {
    eprintln!("sfsutil: error: {msg}");
    exit(1);
}

fn usage() -> ! {
    eprintln!(
        "usage: sfsutil <command> [args...]\n\
         \n\
         commands:\n\
         \x20   format <path> <blocks>       create <path> as <blocks> * 4096 bytes, then format it\n\
         \x20   debug  <path>                dump the superblock and every valid inode\n\
         \x20   create <path>                allocate a new inode, print its number\n\
         \x20   remove <path> <inode>        free an inode and its blocks\n\
         \x20   stat   <path> <inode>        print an inode's size in bytes\n\
         \x20   read   <path> <inode> <offset> <length>   print bytes read to stdout\n\
         \x20   write  <path> <inode> <offset> <text>     write <text>'s bytes at <offset>\n\
         \x20   demo   [blocks]              run a self-contained demo against an in-memory disk"
    );
    exit(1);
}

fn parse_u32(s: &OsString, what: &str) -> u32 {
    s.to_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| error(format!("invalid {what}: {}", s.to_string_lossy())))
}

fn open_disk(path: &PathBuf) -> FileDisk {
    FileDisk::open(path).unwrap_or_else(|e| error(format!("{}: {e}", path.display())))
}

fn main() {
    let mut args = env::args_os().skip(1);
    let command = args.next().unwrap_or_else(|| usage());
    let command = command.to_string_lossy().into_owned();

    match command.as_str() {
        "format" => {
            let path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
            let blocks_arg = args.next().unwrap_or_else(|| usage());
            let blocks = parse_u32(&blocks_arg, "block count");

            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .unwrap_or_else(|e| error(format!("{}: {e}", path.display())));
            file.set_len(blocks as u64 * sfs::block::BLOCK_SIZE as u64)
                .unwrap_or_else(|e| error(format!("{}: {e}", path.display())));
            drop(file);

            let mut disk = open_disk(&path);
            FileSystem::format(&mut disk).unwrap_or_else(|e| error(e));
            println!("formatted {} ({blocks} blocks)", path.display());
        }
        "debug" => {
            let path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
            let disk = open_disk(&path);
            let mut fs = FileSystem::mount(disk).unwrap_or_else(|e| error(e));
            fs.debug(&mut io::stdout()).unwrap_or_else(|e| error(e));
        }
        "create" => {
            let path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
            let disk = open_disk(&path);
            let mut fs = FileSystem::mount(disk).unwrap_or_else(|e| error(e));
            let n = fs.create().unwrap_or_else(|e| error(e));
            println!("{n}");
        }
        "remove" => {
            let path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
            let inode = parse_u32(&args.next().unwrap_or_else(|| usage()), "inode number");
            let disk = open_disk(&path);
            let mut fs = FileSystem::mount(disk).unwrap_or_else(|e| error(e));
            fs.remove(inode).unwrap_or_else(|e| error(e));
        }
        "stat" => {
            let path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
            let inode = parse_u32(&args.next().unwrap_or_else(|| usage()), "inode number");
            let disk = open_disk(&path);
            let mut fs = FileSystem::mount(disk).unwrap_or_else(|e| error(e));
            let size = fs.stat(inode).unwrap_or_else(|e| error(e));
            println!("{size}");
        }
        "read" => {
            let path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
            let inode = parse_u32(&args.next().unwrap_or_else(|| usage()), "inode number");
            let offset = parse_u32(&args.next().unwrap_or_else(|| usage()), "offset");
            let length = parse_u32(&args.next().unwrap_or_else(|| usage()), "length");
            let disk = open_disk(&path);
            let mut fs = FileSystem::mount(disk).unwrap_or_else(|e| error(e));
            let mut buf = vec![0u8; length as usize];
            let n = fs.read(inode, &mut buf, offset).unwrap_or_else(|e| error(e));
            io::stdout()
                .write_all(&buf[..n])
                .unwrap_or_else(|e| error(e));
        }
        "write" => {
            let path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
            let inode = parse_u32(&args.next().unwrap_or_else(|| usage()), "inode number");
            let offset = parse_u32(&args.next().unwrap_or_else(|| usage()), "offset");
            let text = args.next().unwrap_or_else(|| usage());
            let data = text.to_string_lossy().into_owned().into_bytes();
            let disk = open_disk(&path);
            let mut fs = FileSystem::mount(disk).unwrap_or_else(|e| error(e));
            let n = fs.write(inode, &data, offset).unwrap_or_else(|e| error(e));
            println!("{n}");
        }
        "demo" => {
            let blocks = args
                .next()
                .map(|s| parse_u32(&s, "block count"))
                .unwrap_or(100);
            let mut disk = MemDisk::new(blocks);
            FileSystem::format(&mut disk).unwrap_or_else(|e| error(e));
            let mut fs = FileSystem::mount(disk).unwrap_or_else(|e| error(e));

            let n = fs.create().unwrap_or_else(|e| error(e));
            fs.write(n, b"hello from sfsutil", 0)
                .unwrap_or_else(|e| error(e));
            let mut out = [0u8; 19];
            fs.read(n, &mut out, 0).unwrap_or_else(|e| error(e));
            println!("inode {n}: {:?}", String::from_utf8_lossy(&out));
            fs.debug(&mut io::stdout()).unwrap_or_else(|e| error(e));
        }
        "-h" | "--help" => usage(),
        other => error(format!("unknown command `{other}`")),
    }
}
