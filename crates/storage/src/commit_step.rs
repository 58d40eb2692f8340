use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tracing::debug;

/// The last fully completed phase of the three-phase synchronization commit.
///
/// The marker is advanced monotonically within one synchronization attempt
/// and never rolled back except by [`CommitStepFile::reset`]. On disk it
/// always reflects the last phase that finished; a crash leaves it at the
/// phase before the one that was in progress, which tells the startup
/// recovery routine which downstream queues are safe to replay, which must
/// be rewound to their reader-visible indexes and which must be purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitOperationStep {
    /// Peer blocks have been appended to block storage.
    BlocksWritten,
    /// Cache state changes have been flushed and exported.
    StateWritten,
    /// Everything is up to date; downstream queues may advance.
    AllUpdated,
}

impl CommitOperationStep {
    const fn to_raw(self) -> u64 {
        match self {
            Self::BlocksWritten => 0,
            Self::StateWritten => 1,
            Self::AllUpdated => 2,
        }
    }

    const fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::BlocksWritten),
            1 => Some(Self::StateWritten),
            2 => Some(Self::AllUpdated),
            _ => None,
        }
    }
}

/// The commit-step marker persisted as a single 64-bit word.
///
/// A missing marker file reads as [`CommitOperationStep::AllUpdated`]: a
/// fresh data directory is indistinguishable from one where every commit
/// completed.
#[derive(Debug, Clone)]
pub struct CommitStepFile {
    path: PathBuf,
}

impl CommitStepFile {
    /// Create a handle over the marker at the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Durably persist the given step, overwriting unconditionally.
    pub fn set(&self, step: CommitOperationStep) -> io::Result<()> {
        // Write-then-rename so a crash mid-write cannot leave a torn marker.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, step.to_raw().to_le_bytes())?;
        fs::rename(&tmp, &self.path)?;
        debug!(target: "storage::commit", ?step, "Persisted commit step");
        Ok(())
    }

    /// Read the persisted step.
    pub fn get(&self) -> io::Result<CommitOperationStep> {
        let raw = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(CommitOperationStep::AllUpdated)
            }
            Err(err) => return Err(err),
        };
        let word: [u8; 8] = raw
            .as_slice()
            .try_into()
            .map_err(|_| io::Error::new(ErrorKind::InvalidData, "commit step marker is torn"))?;
        CommitOperationStep::from_raw(u64::from_le_bytes(word)).ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidData, "commit step marker holds an unknown phase")
        })
    }

    /// Remove the marker.
    pub fn reset(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
