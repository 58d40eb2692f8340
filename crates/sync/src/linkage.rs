use palisade_primitives::{BlockElement, ChainScore, Header, B256, U256};

/// Returns `true` iff `child` is a valid successor of `parent`.
///
/// A valid link increments the height by exactly one, references the
/// parent's entity hash and moves time strictly forward; an equal timestamp
/// is not a valid link.
pub fn is_link(parent: &Header, parent_hash: B256, child: &Header) -> bool {
    child.number == parent.number + 1 &&
        child.parent_hash == parent_hash &&
        child.timestamp > parent.timestamp
}

/// The score contributed by one parent-child link.
///
/// Deterministic in the child's difficulty and the elapsed time between the
/// two blocks, and never negative: a slow block contributes less weight, but
/// never subtracts from the chain.
pub fn block_score(parent: &Header, child: &Header) -> ChainScore {
    let elapsed = child.timestamp.saturating_sub(parent.timestamp);
    ChainScore::new(child.difficulty.saturating_sub(U256::from(elapsed)))
}

/// The cumulative score of `blocks` chained onto `parent`.
///
/// Sums [`block_score`] over consecutive pairs starting at `parent`; the
/// blocks are assumed to link (see [`is_link`]).
pub fn partial_chain_score<'a>(
    parent: &Header,
    blocks: impl IntoIterator<Item = &'a BlockElement>,
) -> ChainScore {
    let mut score = ChainScore::ZERO;
    let mut prev: &Header = parent;
    for block in blocks {
        score += block_score(prev, block.header());
        prev = block.header();
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_primitives::{Block, BlockElement};

    fn parent() -> Header {
        Header { number: 5, timestamp: 100, difficulty: U256::from(1000), ..Default::default() }
    }

    fn child_of(parent: &Header, parent_hash: B256) -> Header {
        Header {
            number: parent.number + 1,
            parent_hash,
            timestamp: parent.timestamp + 15,
            difficulty: U256::from(1000),
            ..Default::default()
        }
    }

    #[test]
    fn valid_link_is_accepted() {
        let parent = parent();
        let hash = parent.hash_slow();
        let child = child_of(&parent, hash);
        assert!(is_link(&parent, hash, &child));
    }

    #[test]
    fn any_violated_condition_breaks_the_link() {
        let parent = parent();
        let hash = parent.hash_slow();
        let child = child_of(&parent, hash);

        let mut wrong_height = child.clone();
        wrong_height.number += 1;
        assert!(!is_link(&parent, hash, &wrong_height));

        let mut wrong_parent = child.clone();
        wrong_parent.parent_hash = B256::repeat_byte(0xff);
        assert!(!is_link(&parent, hash, &wrong_parent));

        let mut equal_timestamp = child.clone();
        equal_timestamp.timestamp = parent.timestamp;
        assert!(!is_link(&parent, hash, &equal_timestamp));

        let mut earlier_timestamp = child;
        earlier_timestamp.timestamp = parent.timestamp - 1;
        assert!(!is_link(&parent, hash, &earlier_timestamp));
    }

    #[test]
    fn score_never_goes_negative() {
        let parent = parent();
        let mut slow_child = child_of(&parent, parent.hash_slow());
        slow_child.timestamp = parent.timestamp + 10_000;
        assert_eq!(block_score(&parent, &slow_child), ChainScore::ZERO);
    }

    #[test]
    fn partial_score_is_the_sum_of_pairwise_scores() {
        let parent = parent();
        let mut blocks = Vec::new();
        let mut prev = parent.clone();
        for _ in 0..3 {
            let child = child_of(&prev, prev.hash_slow());
            prev = child.clone();
            blocks.push(BlockElement::new(Block { header: child, body: vec![] }.seal_slow()));
        }

        let mut expected = ChainScore::ZERO;
        let mut prev: &Header = &parent;
        for block in &blocks {
            expected += block_score(prev, block.header());
            prev = block.header();
        }
        assert_eq!(partial_chain_score(&parent, &blocks), expected);
        // Each link contributes difficulty minus elapsed time.
        assert_eq!(expected, ChainScore::from(3 * (1000 - 15) as u64));
    }
}
