//! Directory capability checks.
//!
//! Access to a folder is modelled as a three-state capability with an explicit
//! upgrade step from [`Capability::NeedsPrompt`]. Scanning and writing only
//! accept a [`GrantedDir`], which can only be obtained through
//! [`ensure_read_access`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Granted,
    NeedsPrompt,
    Denied,
}

pub trait AccessProbe: Send + Sync {
    /// Checks the current state without side effects.
    fn query(&self, path: &Path) -> Capability;

    /// Attempts to upgrade a `NeedsPrompt` capability.
    fn request(&self, path: &Path) -> Capability;
}

/// Filesystem-backed probe.
///
/// A listable directory is granted; a missing one needs a prompt, which
/// `request` answers by creating it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl AccessProbe for FsProbe {
    fn query(&self, path: &Path) -> Capability {
        match fs::read_dir(path) {
            Ok(_) => Capability::Granted,
            Err(err) if err.kind() == ErrorKind::NotFound => Capability::NeedsPrompt,
            Err(err) => {
                debug!(path = %path.display(), "directory not readable: {err}");
                Capability::Denied
            }
        }
    }

    fn request(&self, path: &Path) -> Capability {
        match self.query(path) {
            Capability::NeedsPrompt => match fs::create_dir_all(path) {
                Ok(()) => self.query(path),
                Err(err) => {
                    debug!(path = %path.display(), "could not create directory: {err}");
                    Capability::Denied
                }
            },
            other => other,
        }
    }
}

/// Proof that read access to a directory was confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedDir {
    path: PathBuf,
}

impl GrantedDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Query-then-request sequence.
pub fn ensure_read_access(probe: &dyn AccessProbe, path: &Path) -> Result<GrantedDir> {
    let capability = match probe.query(path) {
        Capability::NeedsPrompt => probe.request(path),
        other => other,
    };

    match capability {
        Capability::Granted => Ok(GrantedDir {
            path: path.to_path_buf(),
        }),
        Capability::NeedsPrompt | Capability::Denied => {
            Err(Error::PermissionDenied(path.to_path_buf()))
        }
    }
}
