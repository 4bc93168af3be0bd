//! The authorization document.
//!
//! A [`Darc`] maps action names to expressions over identities. Each version
//! is content-addressed; the id of version 0 names the whole lineage and is
//! carried forward as `base_id` by every later version, while `prev_id`
//! links a version to the one it replaced.

use bytes::Bytes;
use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use omniledger_core::canonical::{bytes, uint};
use omniledger_core::{encode_canonical, Blake3Hash, DarcId, Identity, Signature};

use crate::error::{DarcError, Result};
use crate::rules::{Rules, EVOLVE_ACTION, SIGN_ACTION};

/// Default bound on nested `darc:` identity resolution.
pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 8;

const EVOLVE_DOMAIN: &[u8] = b"omniledger/darc-evolve/v1";

/// Looks up the current version of a document lineage.
///
/// Used to resolve [`Identity::Darc`] delegation during evaluation. A
/// resolver that cannot find a lineage returns `None` and the delegating
/// identity is treated as unsatisfied.
pub trait DarcResolver {
    fn latest_darc(&self, base_id: &DarcId) -> Option<Darc>;
}

/// Resolver that knows no documents. Delegated identities never satisfy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl DarcResolver for NoResolver {
    fn latest_darc(&self, _base_id: &DarcId) -> Option<Darc> {
        None
    }
}

/// One version of an authorization document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Darc {
    pub version: u64,
    pub description: Bytes,
    /// Id of version 0. `None` on version 0 itself.
    pub base_id: Option<DarcId>,
    /// Id of the version this one replaced. `None` on version 0.
    pub prev_id: Option<DarcId>,
    pub rules: Rules,
}

impl Darc {
    /// Create a genesis (version 0) document.
    pub fn new(rules: Rules, description: impl Into<Bytes>) -> Self {
        Self {
            version: 0,
            description: description.into(),
            base_id: None,
            prev_id: None,
            rules,
        }
    }

    /// Content hash of this version.
    pub fn id(&self) -> DarcId {
        let encoded = encode_canonical(&self.to_canonical_value());
        DarcId::from_bytes(*Blake3Hash::hash(&encoded).as_bytes())
    }

    /// Lineage id: this version's id if it is version 0, otherwise the stored base.
    pub fn base_id(&self) -> DarcId {
        match self.base_id {
            Some(base) if self.version > 0 => base,
            _ => self.id(),
        }
    }

    /// The identity that delegates to this lineage's `_sign` rule.
    pub fn as_identity(&self) -> Identity {
        Identity::Darc(self.base_id())
    }

    fn to_canonical_value(&self) -> Value {
        let opt_id = |id: &Option<DarcId>| match id {
            Some(id) => bytes(id.as_bytes()),
            None => Value::Null,
        };
        Value::Map(vec![
            (uint(0), uint(self.version)),
            (uint(1), bytes(&self.description)),
            (uint(2), opt_id(&self.base_id)),
            (uint(3), opt_id(&self.prev_id)),
            (uint(4), self.rules.to_canonical_value()),
        ])
    }

    /// Check that `identities` satisfy the rule for `action`.
    ///
    /// A missing rule denies. `darc:` identities in the rule are not resolved.
    pub fn evaluate(&self, action: &str, identities: &[Identity]) -> Result<()> {
        self.evaluate_with(action, identities, &NoResolver, 0)
    }

    /// Like [`evaluate`](Self::evaluate) but reports a plain boolean.
    pub fn allows(&self, action: &str, identities: &[Identity]) -> bool {
        self.evaluate(action, identities).is_ok()
    }

    /// Evaluate `action`, resolving `darc:` identities through `resolver`.
    ///
    /// A delegated identity is satisfied when the presented identities satisfy
    /// the `_sign` rule of the latest version of that lineage. Nesting is
    /// bounded by `max_depth`; a lineage already on the resolution path is
    /// never satisfied.
    pub fn evaluate_with(
        &self,
        action: &str,
        identities: &[Identity],
        resolver: &dyn DarcResolver,
        max_depth: usize,
    ) -> Result<()> {
        let expr = self.rules.get(action).ok_or_else(|| DarcError::RuleNotFound {
            action: action.to_string(),
        })?;

        let ctx = Delegation {
            identities,
            resolver,
        };
        let base_id = self.base_id();
        if expr.evaluate(&|id| ctx.satisfied(id, max_depth, &[base_id])) {
            Ok(())
        } else {
            Err(DarcError::Unauthorized {
                action: action.to_string(),
                base_id,
            })
        }
    }

    /// Draft the next version with new rules.
    ///
    /// The draft is not authorized; see [`verify_successor`](Self::verify_successor).
    pub fn successor(&self, rules: Rules, description: Option<Bytes>) -> Darc {
        Darc {
            version: self.version + 1,
            description: description.unwrap_or_else(|| self.description.clone()),
            base_id: Some(self.base_id()),
            prev_id: Some(self.id()),
            rules,
        }
    }

    /// Bytes that evolvers sign to authorize this version.
    pub fn evolution_message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(EVOLVE_DOMAIN.len() + 32);
        msg.extend_from_slice(EVOLVE_DOMAIN);
        msg.extend_from_slice(self.id().as_bytes());
        msg
    }

    /// Check that `next` is a well-formed successor authorized by this version.
    pub fn verify_successor(&self, next: &Darc, signatures: &[Signature]) -> Result<()> {
        self.verify_successor_with(next, signatures, &NoResolver, 0)
    }

    /// [`verify_successor`](Self::verify_successor) with delegation.
    pub fn verify_successor_with(
        &self,
        next: &Darc,
        signatures: &[Signature],
        resolver: &dyn DarcResolver,
        max_depth: usize,
    ) -> Result<()> {
        self.verify_link(next)?;

        let deny = |reason: String| DarcError::EvolutionDenied {
            base_id: self.base_id(),
            version: next.version,
            reason,
        };
        let message = next.evolution_message();
        let mut signers = Vec::with_capacity(signatures.len());
        for (index, sig) in signatures.iter().enumerate() {
            sig.verify(&message).map_err(|_| {
                deny(
                    DarcError::BadSignature {
                        index,
                        signer: sig.signer,
                    }
                    .to_string(),
                )
            })?;
            signers.push(sig.signer);
        }

        self.evaluate_with(EVOLVE_ACTION, &signers, resolver, max_depth)
            .map_err(|e| deny(e.to_string()))
    }

    /// Check that `next` is structurally the version after this one.
    ///
    /// Says nothing about who authorized it.
    pub fn verify_link(&self, next: &Darc) -> Result<()> {
        let deny = |reason: String| DarcError::EvolutionDenied {
            base_id: self.base_id(),
            version: next.version,
            reason,
        };

        if next.version != self.version + 1 {
            return Err(deny(format!(
                "expected version {}, got {}",
                self.version + 1,
                next.version
            )));
        }
        if next.base_id != Some(self.base_id()) {
            return Err(deny("base id does not match lineage".into()));
        }
        if next.prev_id != Some(self.id()) {
            return Err(deny("previous id does not match current version".into()));
        }
        next.rules.validate().map_err(|e| deny(e.to_string()))
    }

    /// Produce and authorize the next version in one step.
    pub fn evolve(&self, new_rules: Rules, signatures: &[Signature]) -> Result<Darc> {
        let next = self.successor(new_rules, None);
        self.verify_successor(&next, signatures)?;
        Ok(next)
    }

    /// Check expression validity and the version/base/prev shape.
    pub fn verify_structure(&self) -> Result<()> {
        self.rules.validate()?;
        match (self.version, self.base_id, self.prev_id) {
            (0, None, None) => Ok(()),
            (0, _, _) => Err(DarcError::InvalidDarc(
                "version 0 must not carry base or previous id".into(),
            )),
            (_, Some(_), Some(_)) => Ok(()),
            (v, _, _) => Err(DarcError::InvalidDarc(format!(
                "version {v} must carry base and previous id"
            ))),
        }
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

struct Delegation<'a> {
    identities: &'a [Identity],
    resolver: &'a dyn DarcResolver,
}

impl Delegation<'_> {
    fn satisfied(&self, id: &Identity, depth: usize, path: &[DarcId]) -> bool {
        if self.identities.contains(id) {
            return true;
        }
        let Some(base) = id.as_darc() else {
            return false;
        };
        if depth == 0 || path.contains(base) {
            return false;
        }
        let Some(darc) = self.resolver.latest_darc(base) else {
            return false;
        };
        let Some(expr) = darc.rules.get(SIGN_ACTION) else {
            return false;
        };

        let mut next_path = path.to_vec();
        next_path.push(*base);
        expr.evaluate(&|inner| self.satisfied(inner, depth - 1, &next_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use omniledger_core::{Keypair, Signer};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn kp(seed: u8) -> Keypair {
        Keypair::from_seed(&[seed; 32])
    }

    fn owned_by(owner: &Keypair) -> Darc {
        Darc::new(
            Rules::init(&[owner.identity()], &[owner.identity()]),
            "test darc",
        )
    }

    #[derive(Default)]
    struct MapResolver(HashMap<DarcId, Darc>);

    impl MapResolver {
        fn with(mut self, darc: &Darc) -> Self {
            self.0.insert(darc.base_id(), darc.clone());
            self
        }
    }

    impl DarcResolver for MapResolver {
        fn latest_darc(&self, base_id: &DarcId) -> Option<Darc> {
            self.0.get(base_id).cloned()
        }
    }

    #[test]
    fn test_id_is_deterministic_and_content_bound() {
        let owner = kp(1);
        let a = owned_by(&owner);
        let b = owned_by(&owner);
        assert_eq!(a.id(), b.id());

        let mut c = a.clone();
        c.description = Bytes::from_static(b"other");
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_base_id_of_genesis_is_own_id() {
        let d = owned_by(&kp(1));
        assert_eq!(d.base_id(), d.id());
        assert!(d.verify_structure().is_ok());
    }

    #[test]
    fn test_missing_rule_is_not_found() {
        let owner = kp(1);
        let d = owned_by(&owner);
        assert!(matches!(
            d.evaluate("spawn:value", &[owner.identity()]),
            Err(DarcError::RuleNotFound { .. })
        ));
    }

    #[test]
    fn test_unsatisfied_rule_is_unauthorized() {
        let d = owned_by(&kp(1));
        let err = d.evaluate(EVOLVE_ACTION, &[kp(2).identity()]).unwrap_err();
        assert!(matches!(err, DarcError::Unauthorized { ref action, .. } if action == EVOLVE_ACTION));
        assert!(!d.allows(EVOLVE_ACTION, &[]));
    }

    #[test]
    fn test_evolve_with_owner_signature() {
        let owner = kp(1);
        let v0 = owned_by(&owner);
        let rules = v0
            .rules
            .with_rule("spawn:value", Expression::Id(kp(2).identity()))
            .unwrap();
        let draft = v0.successor(rules.clone(), None);
        let sig = Signature::create(&owner, &draft.evolution_message()).unwrap();

        let v1 = v0.evolve(rules, &[sig]).unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v1.base_id(), v0.base_id());
        assert_eq!(v1.prev_id, Some(v0.id()));
        assert!(v1.verify_structure().is_ok());
        assert!(v1.allows("spawn:value", &[kp(2).identity()]));
    }

    #[test]
    fn test_evolve_denied_for_stranger() {
        let v0 = owned_by(&kp(1));
        let stranger = kp(9);
        let draft = v0.successor(v0.rules.clone(), None);
        let sig = Signature::create(&stranger, &draft.evolution_message()).unwrap();

        let err = v0.evolve(v0.rules.clone(), &[sig]).unwrap_err();
        assert!(matches!(err, DarcError::EvolutionDenied { version: 1, .. }));
    }

    #[test]
    fn test_evolve_denied_without_signatures() {
        let v0 = owned_by(&kp(1));
        assert!(matches!(
            v0.evolve(v0.rules.clone(), &[]),
            Err(DarcError::EvolutionDenied { .. })
        ));
    }

    #[test]
    fn test_signature_over_other_draft_rejected() {
        let owner = kp(1);
        let v0 = owned_by(&owner);
        let other = v0.successor(Rules::init(&[kp(2).identity()], &[]), None);
        let sig = Signature::create(&owner, &other.evolution_message()).unwrap();

        let err = v0.evolve(v0.rules.clone(), &[sig]).unwrap_err();
        match err {
            DarcError::EvolutionDenied { reason, .. } => assert!(reason.contains("index 0")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_skipped_version_rejected() {
        let owner = kp(1);
        let v0 = owned_by(&owner);
        let mut next = v0.successor(v0.rules.clone(), None);
        next.version = 2;
        let sig = Signature::create(&owner, &next.evolution_message()).unwrap();
        assert!(v0.verify_successor(&next, &[sig]).is_err());
    }

    #[test]
    fn test_structure_rejects_dangling_links() {
        let mut d = owned_by(&kp(1));
        d.prev_id = Some(DarcId::ZERO);
        assert!(matches!(d.verify_structure(), Err(DarcError::InvalidDarc(_))));

        let mut d = owned_by(&kp(1));
        d.version = 3;
        assert!(matches!(d.verify_structure(), Err(DarcError::InvalidDarc(_))));
    }

    #[test]
    fn test_delegation_through_sign_rule() {
        let member = kp(3);
        let team = owned_by(&member);
        let project = Darc::new(
            Rules::init(&[team.as_identity()], &[team.as_identity()]),
            "project",
        );
        let resolver = MapResolver::default().with(&team);

        assert!(project.evaluate(SIGN_ACTION, &[member.identity()]).is_err());
        project
            .evaluate_with(SIGN_ACTION, &[member.identity()], &resolver, 4)
            .unwrap();
        assert!(project
            .evaluate_with(SIGN_ACTION, &[member.identity()], &resolver, 0)
            .is_err());
    }

    #[test]
    fn test_delegation_cycle_fails_closed() {
        let a_id = DarcId::from_label("a");
        let b_id = DarcId::from_label("b");
        let mut a = Darc::new(
            Rules::new()
                .with_rule(SIGN_ACTION, Expression::Id(Identity::Darc(b_id)))
                .unwrap(),
            "a",
        );
        a.version = 1;
        a.base_id = Some(a_id);
        let mut b = a.clone();
        b.base_id = Some(b_id);
        b.rules = Rules::new()
            .with_rule(SIGN_ACTION, Expression::Id(Identity::Darc(a_id)))
            .unwrap();

        let resolver = MapResolver::default().with(&a).with(&b);
        assert!(a
            .evaluate_with(SIGN_ACTION, &[kp(1).identity()], &resolver, 64)
            .is_err());
    }

    #[test]
    fn test_wire_roundtrip() {
        let d = owned_by(&kp(1));
        let back = Darc::from_bytes(&d.to_bytes().unwrap()).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.id(), d.id());
    }

    proptest! {
        #[test]
        fn prop_absent_action_always_denied(
            action in "[a-z]{1,8}:[a-z]{1,8}",
            seeds in proptest::collection::vec(any::<u8>(), 0..6),
        ) {
            let owner = kp(1);
            let d = owned_by(&owner);
            prop_assume!(!d.rules.contains(&action));
            let mut ids: Vec<Identity> = seeds.iter().map(|s| kp(*s).identity()).collect();
            ids.push(owner.identity());
            prop_assert!(!d.allows(&action, &ids));
            let denied = matches!(
                d.evaluate(&action, &ids),
                Err(DarcError::RuleNotFound { .. })
            );
            prop_assert!(denied);
        }
    }
}
