//! Deterministic ordering of concurrently submitted transactions.
//!
//! Transactions are ordered by their hash, compared as raw bytes. The order
//! depends only on transaction content, so every node that sees the same set
//! produces the same sequence. Identical transactions keep their input order.

use crate::error::{Result, TxError};
use crate::transaction::ClientTransaction;

/// Sort in place by transaction hash.
///
/// Every transaction is checked before anything moves; on error the slice
/// is left untouched.
pub fn sort_transactions(txs: &mut [ClientTransaction]) -> Result<()> {
    for (index, tx) in txs.iter().enumerate() {
        tx.check_not_empty()
            .map_err(|_| TxError::MalformedTransaction(format!("transaction {index} is empty")))?;
    }
    txs.sort_by_cached_key(|tx| tx.digest());
    Ok(())
}

/// Owned variant of [`sort_transactions`].
pub fn sorted(mut txs: Vec<ClientTransaction>) -> Result<Vec<ClientTransaction>> {
    sort_transactions(&mut txs)?;
    Ok(txs)
}
