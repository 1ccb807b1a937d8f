//! Recursive, post-order directory deletion.
//!
//! The walk keeps an explicit stack of open directories instead of
//! recursing, so deep trees cannot exhaust the call stack. Every child is
//! removed before its parent. The first failure stops the walk; whatever
//! was already removed stays removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, ShellError};

/// The filesystem calls the deletion walk needs.
pub trait TreeOps {
    /// Full paths of the entries of `dir`, without `.` and `..`.
    fn entries(&mut self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    /// Whether `path` itself is a directory. Symbolic links are not followed.
    fn is_dir(&mut self, path: &Path) -> io::Result<bool>;
    fn remove_file(&mut self, path: &Path) -> io::Result<()>;
    fn remove_dir(&mut self, path: &Path) -> io::Result<()>;
}

/// [`TreeOps`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsTree;

impl TreeOps for OsTree {
    fn entries(&mut self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        // read_dir never yields the `.` and `..` pseudo-entries.
        fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn is_dir(&mut self, path: &Path) -> io::Result<bool> {
        Ok(fs::symlink_metadata(path)?.is_dir())
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}

struct Frame {
    dir: PathBuf,
    pending: std::vec::IntoIter<PathBuf>,
}

impl Frame {
    fn open<T: TreeOps + ?Sized>(ops: &mut T, dir: PathBuf) -> Result<Self> {
        let entries = ops
            .entries(&dir)
            .map_err(|source| ShellError::CannotOpenDirectory {
                path: dir.clone(),
                source,
            })?;
        Ok(Frame {
            dir,
            pending: entries.into_iter(),
        })
    }
}

/// Delete the directory at `path` and everything below it.
pub fn delete_tree(path: &Path) -> Result<()> {
    delete_tree_with(&mut OsTree, path)
}

/// [`delete_tree`] over an arbitrary [`TreeOps`].
pub fn delete_tree_with<T: TreeOps + ?Sized>(ops: &mut T, path: &Path) -> Result<()> {
    log::debug!("deleting tree {}", path.display());
    let mut stack = vec![Frame::open(ops, path.to_path_buf())?];

    while let Some(frame) = stack.last_mut() {
        match frame.pending.next() {
            Some(entry) => {
                let is_dir = ops
                    .is_dir(&entry)
                    .map_err(|e| ShellError::fs("stat", &entry, e))?;
                if is_dir {
                    stack.push(Frame::open(ops, entry)?);
                } else {
                    ops.remove_file(&entry)
                        .map_err(|e| ShellError::fs("remove", &entry, e))?;
                    log::trace!("removed {}", entry.display());
                }
            }
            None => {
                if let Some(done) = stack.pop() {
                    ops.remove_dir(&done.dir)
                        .map_err(|e| ShellError::fs("remove directory", &done.dir, e))?;
                    log::trace!("removed directory {}", done.dir.display());
                }
            }
        }
    }
    Ok(())
}
