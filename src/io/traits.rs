//! Filesystem abstraction for the backup/validation manager.
//!
//! Splitting mutates the filesystem through this trait only, which keeps the
//! mutation path testable: fault-injecting implementations can simulate
//! partial write failures without touching a real disk.

use std::io;
use std::path::Path;

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}
