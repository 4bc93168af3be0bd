//! Client transactions: atomic, ordered batches of instructions.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use omniledger_core::canonical::bytes;
use omniledger_core::{encode_canonical, Blake3Hash};
use omniledger_darc::{Darc, DarcError};

use crate::error::{Result, TxError};
use crate::instruction::Instruction;

/// An ordered, non-empty list of instructions applied all or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTransaction {
    pub instructions: Vec<Instruction>,
}

impl ClientTransaction {
    /// Wrap instructions; an empty list is rejected.
    pub fn new(instructions: Vec<Instruction>) -> Result<Self> {
        let tx = Self { instructions };
        tx.check_not_empty()?;
        Ok(tx)
    }

    /// A transaction with exactly one instruction.
    pub fn single(instruction: Instruction) -> Self {
        Self {
            instructions: vec![instruction],
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub(crate) fn check_not_empty(&self) -> Result<()> {
        if self.instructions.is_empty() {
            return Err(TxError::MalformedTransaction(
                "transaction has no instructions".into(),
            ));
        }
        Ok(())
    }

    /// Hash over the ordered instructions, signatures included.
    ///
    /// Transactions that differ only in who signed them hash differently.
    pub fn hash(&self) -> Result<Blake3Hash> {
        self.check_not_empty()?;
        Ok(self.digest())
    }

    pub(crate) fn digest(&self) -> Blake3Hash {
        let encoded = self
            .instructions
            .iter()
            .map(|i| bytes(&i.to_canonical_bytes()))
            .collect();
        Blake3Hash::hash(&encode_canonical(&Value::Array(encoded)))
    }

    /// Verify every instruction in order against the document `lookup` yields.
    ///
    /// Stops at the first failure and reports its index.
    pub fn verify_against<F>(&self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&Instruction) -> std::result::Result<Darc, DarcError>,
    {
        self.check_not_empty()?;
        for (index, instr) in self.instructions.iter().enumerate() {
            lookup(instr)
                .and_then(|darc| instr.verify(&darc))
                .map_err(|source| TxError::InstructionRejected { index, source })?;
        }
        Ok(())
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(omniledger_core::to_cbor(self)?)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(omniledger_core::from_cbor(bytes)?)
    }
}
