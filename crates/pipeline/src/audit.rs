use crate::{Consumer, ConsumerInput, ConsumerResult};
use async_trait::async_trait;
use palisade_primitives::{BlockElement, BlockNumber, InputSource, PeerId};
use serde::Serialize;
use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::warn;

#[derive(Serialize)]
struct AuditRecord {
    id: u64,
    source: InputSource,
    peer: PeerId,
    first_height: BlockNumber,
    last_height: BlockNumber,
    count: usize,
}

/// A leading consumer that mirrors every block batch to an audit log.
///
/// One JSON line is appended per batch, recording where the batch came from
/// and which heights it covered, for forensic replay. The batch itself is
/// never altered and audit IO failures never reject a batch.
#[derive(Debug)]
pub struct AuditConsumer {
    path: PathBuf,
}

impl AuditConsumer {
    /// Create an audit consumer appending to the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn append(&self, record: &AuditRecord) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        file.write_all(&line)
    }
}

#[async_trait]
impl Consumer<BlockElement> for AuditConsumer {
    fn name(&self) -> &'static str {
        "audit"
    }

    async fn consume(&mut self, input: &mut ConsumerInput<BlockElement>) -> ConsumerResult {
        let elements = input.elements();
        let record = AuditRecord {
            id: input.id(),
            source: input.source(),
            peer: input.peer(),
            first_height: elements.first().map(|e| e.number()).unwrap_or_default(),
            last_height: elements.last().map(|e| e.number()).unwrap_or_default(),
            count: elements.len(),
        };

        if let Err(err) = self.append(&record) {
            warn!(target: "sync::pipeline", path = %self.path.display(), %err, "Failed to append audit record");
        }
        ConsumerResult::Continue
    }
}
