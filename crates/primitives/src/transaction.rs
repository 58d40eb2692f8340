use alloy_primitives::{Address, BlockNumber, Bytes, B256};
use serde::{Deserialize, Serialize};

/// A signed transaction.
///
/// The synchronization core never looks inside the payload; signature and
/// wire-format verification happen in earlier pipeline stages, so by the time
/// a transaction reaches this crate its hash is already computed and trusted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionSigned {
    /// The entity hash of the transaction.
    pub hash: B256,
    /// The account that signed the transaction.
    pub signer: Address,
    /// Opaque transaction payload.
    pub payload: Bytes,
}

/// Identifying information about a confirmed transaction.
///
/// Carried through unwinds so the unconfirmed-transaction pool can be
/// corrected after a reorganization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionInfo {
    /// The entity hash of the transaction.
    pub hash: B256,
    /// The height of the block that confirmed the transaction.
    pub height: BlockNumber,
}
