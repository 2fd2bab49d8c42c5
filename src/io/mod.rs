//! Filesystem side of splitting: the `FileSystem` trait, its production
//! implementation, and the backup/write/validate manager.

pub mod backup;
pub mod real;
pub mod traits;

pub use backup::{ApplyOutcome, BackupManager, SplitStage};
pub use real::RealFileSystem;
pub use traits::FileSystem;
