//! Random value generators for tests.
//!
//! The generated chains link correctly by height, hash and timestamp but are
//! not otherwise valid; tests that need difficulty-consistent chains build
//! those on top of these helpers.

use palisade_primitives::{
    Block, BlockElement, Header, SealedHeader, TransactionSigned, B256, U256,
};
use rand::{thread_rng, Rng};

/// Generate a random [`SealedHeader`] linked to the given parent hash.
pub fn random_header(number: u64, parent: Option<B256>) -> SealedHeader {
    let mut rng = thread_rng();
    let header = Header {
        number,
        parent_hash: parent.unwrap_or_default(),
        timestamp: number * 15,
        difficulty: U256::from(rng.gen::<u32>()),
        ..Default::default()
    };
    header.seal_slow()
}

/// Generate a range of random [`SealedHeader`]s.
///
/// The parent hash of the first header in the result is `head`; timestamps
/// increase strictly with height.
pub fn random_sealed_header_range(range: std::ops::Range<u64>, head: B256) -> Vec<SealedHeader> {
    let mut headers = Vec::with_capacity(range.end.saturating_sub(range.start) as usize);
    for number in range {
        headers.push(random_header(
            number,
            Some(headers.last().map(|h: &SealedHeader| h.hash()).unwrap_or(head)),
        ));
    }
    headers
}

/// Generate a random signed transaction with an opaque payload.
pub fn random_transaction() -> TransactionSigned {
    let mut rng = thread_rng();
    TransactionSigned {
        hash: B256::random(),
        signer: rng.gen::<[u8; 20]>().into(),
        payload: rng.gen::<[u8; 16]>().to_vec().into(),
    }
}

/// Generate a range of linked [`BlockElement`]s with `tx_count` random
/// transactions each.
pub fn random_block_element_range(
    range: std::ops::Range<u64>,
    head: B256,
    tx_count: usize,
) -> Vec<BlockElement> {
    let mut elements: Vec<BlockElement> = Vec::new();
    for number in range {
        let parent = elements.last().map(|e| e.hash()).unwrap_or(head);
        let header = random_header(number, Some(parent)).unseal();
        let body = (0..tx_count).map(|_| random_transaction()).collect();
        elements.push(BlockElement::new(Block { header, body }.seal_slow()));
    }
    elements
}
