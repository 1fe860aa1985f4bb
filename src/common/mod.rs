//! Shared file, path and traversal utilities used by the packager and installer.

pub mod files;
pub mod paths;
pub mod temp;
pub mod tree;
pub mod walk;

pub use files::{
    copy_file_preserving_mode, mode_of, remove_dir_if_exists, remove_file_if_exists,
    rewrite_preserving_mode, set_mode, write_file_mode, write_file_with_dirs,
};
pub use paths::{ensure_dir_exists, ensure_parent_exists, staged_path, strip_parent_prefix};
pub use temp::prepare_work_dir;
pub use tree::{copy_entry, copy_tree, EntryKind};
pub use walk::walk;
