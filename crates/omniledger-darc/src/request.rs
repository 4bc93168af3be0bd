//! Signed requests checked against a document.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use omniledger_core::{DarcId, Identity, Signature};

use crate::darc::{Darc, DarcResolver, NoResolver, DEFAULT_MAX_DELEGATION_DEPTH};
use crate::error::{DarcError, Result};

/// A request to perform `action` under the document lineage `base_id`.
///
/// `message` is the exact byte string every signature covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub base_id: DarcId,
    pub action: String,
    pub message: Bytes,
    pub signatures: Vec<Signature>,
}

impl Request {
    pub fn new(
        base_id: DarcId,
        action: impl Into<String>,
        message: impl Into<Bytes>,
        signatures: Vec<Signature>,
    ) -> Self {
        Self {
            base_id,
            action: action.into(),
            message: message.into(),
            signatures,
        }
    }

    /// Identities that signed, in signature order.
    pub fn signers(&self) -> Vec<Identity> {
        self.signatures.iter().map(|s| s.signer).collect()
    }

    /// Verify against `darc` without delegation.
    pub fn verify(&self, darc: &Darc) -> Result<()> {
        self.verify_with(darc, &NoResolver, DEFAULT_MAX_DELEGATION_DEPTH)
    }

    /// Verify signatures, check the lineage, then evaluate the action.
    ///
    /// Fails on the first signature that does not verify, naming its index.
    /// A tampered request yields `BadSignature` whichever field was altered.
    pub fn verify_with(
        &self,
        darc: &Darc,
        resolver: &dyn DarcResolver,
        max_depth: usize,
    ) -> Result<()> {
        for (index, sig) in self.signatures.iter().enumerate() {
            sig.verify(&self.message)
                .map_err(|_| DarcError::BadSignature {
                    index,
                    signer: sig.signer,
                })?;
        }

        let got = darc.base_id();
        if got != self.base_id {
            return Err(DarcError::WrongDarc {
                expected: self.base_id,
                got,
            });
        }

        darc.evaluate_with(&self.action, &self.signers(), resolver, max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::rules::Rules;
    use omniledger_core::{Keypair, Signer};

    fn setup() -> (Keypair, Darc) {
        let owner = Keypair::from_seed(&[1; 32]);
        let rules = Rules::init(&[owner.identity()], &[owner.identity()])
            .with_rule("spawn:value", Expression::Id(owner.identity()))
            .unwrap();
        (owner, Darc::new(rules, "request test"))
    }

    #[test]
    fn test_signed_request_verifies() {
        let (owner, darc) = setup();
        let sig = Signature::create(&owner, b"msg").unwrap();
        let req = Request::new(darc.base_id(), "spawn:value", &b"msg"[..], vec![sig]);
        req.verify(&darc).unwrap();
    }

    #[test]
    fn test_wrong_lineage() {
        let (owner, darc) = setup();
        let sig = Signature::create(&owner, b"msg").unwrap();
        let req = Request::new(DarcId::ZERO, "spawn:value", &b"msg"[..], vec![sig]);
        assert!(matches!(req.verify(&darc), Err(DarcError::WrongDarc { .. })));
    }

    #[test]
    fn test_bad_signature_wins_over_wrong_lineage() {
        let (owner, darc) = setup();
        let bad = Signature::create(&owner, b"other").unwrap();
        let req = Request::new(DarcId::ZERO, "spawn:value", &b"msg"[..], vec![bad]);
        assert!(matches!(
            req.verify(&darc),
            Err(DarcError::BadSignature { index: 0, .. })
        ));
    }

    #[test]
    fn test_bad_signature_reports_index() {
        let (owner, darc) = setup();
        let good = Signature::create(&owner, b"msg").unwrap();
        let bad = Signature::create(&owner, b"other").unwrap();
        let req = Request::new(darc.base_id(), "spawn:value", &b"msg"[..], vec![good, bad]);
        assert!(matches!(
            req.verify(&darc),
            Err(DarcError::BadSignature { index: 1, .. })
        ));
    }

    #[test]
    fn test_no_signatures_is_unauthorized() {
        let (_, darc) = setup();
        let req = Request::new(darc.base_id(), "spawn:value", &b"msg"[..], vec![]);
        assert!(matches!(req.verify(&darc), Err(DarcError::Unauthorized { .. })));
    }
}
