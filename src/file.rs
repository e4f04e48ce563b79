//! File access seam for `#include` resolution.

use std::fs;
use std::io;

/// Opens included files. A trait so tests and embedders can substitute
/// their own source of file content.
pub trait FileOpener {
    fn open(&self, path: &str) -> io::Result<String>;
}

/// Reads files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOpener;

impl FileOpener for FsOpener {
    fn open(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }
}
