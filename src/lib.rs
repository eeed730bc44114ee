//! tagfuse exposes a photo database as a browsable, read-only FUSE
//! filesystem. Tag hierarchies and user-defined queries become directories
//! and matching photos become symlinks to the real files on disk.

pub mod config;
pub mod db;
pub mod logging;
pub mod types;
pub mod vfs;
