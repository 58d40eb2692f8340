use palisade_primitives::{InputSource, PeerId};

/// A batch of elements travelling through a pipeline.
///
/// The pipeline owns the batch exclusively while it is in flight. A terminal
/// consumer may [`detach`](ConsumerInput::detach) the elements to forward
/// them elsewhere; the metadata stays behind so the inspector can still
/// attribute the batch to its source.
#[derive(Debug)]
pub struct ConsumerInput<T> {
    source: InputSource,
    peer: PeerId,
    id: u64,
    elements: Vec<T>,
    detached: bool,
}

impl<T> ConsumerInput<T> {
    /// Create a new batch from the given source.
    ///
    /// The batch id is assigned by the dispatcher at submission.
    pub fn new(source: InputSource, peer: PeerId, elements: Vec<T>) -> Self {
        Self { source, peer, id: 0, elements, detached: false }
    }

    /// Where the batch came from.
    pub const fn source(&self) -> InputSource {
        self.source
    }

    /// The peer that supplied the batch.
    pub const fn peer(&self) -> PeerId {
        self.peer
    }

    /// The dispatcher-assigned batch id.
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: u64) {
        self.id = id;
    }

    /// The elements of the batch.
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    /// The number of elements in the batch.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the batch holds no elements.
    ///
    /// An empty, non-detached batch is an upstream contract violation and is
    /// rejected by the dispatcher before any consumer runs.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Move the elements out of the batch.
    ///
    /// Used by terminal consumers that forward the batch downstream.
    pub fn detach(&mut self) -> Vec<T> {
        self.detached = true;
        std::mem::take(&mut self.elements)
    }

    /// Returns `true` if a consumer has taken ownership of the elements.
    pub const fn is_detached(&self) -> bool {
        self.detached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detach_keeps_metadata() {
        let peer = PeerId::repeat_byte(7);
        let mut input = ConsumerInput::new(InputSource::RemotePull, peer, vec![1u32, 2, 3]);
        assert_eq!(input.len(), 3);

        let elements = input.detach();
        assert_eq!(elements, vec![1, 2, 3]);
        assert!(input.is_detached());
        assert!(input.is_empty());
        assert_eq!(input.peer(), peer);
        assert_eq!(input.source(), InputSource::RemotePull);
    }
}
