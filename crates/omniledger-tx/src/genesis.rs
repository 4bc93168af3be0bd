//! Self-bootstrapping spawns.
//!
//! A document lineage comes into existence through a Spawn of the `darc`
//! contract addressed at the lineage's own id. No document exists yet to
//! authorize it, so the instruction is verified against the document it
//! carries.

use omniledger_darc::{Darc, SIGN_ACTION};

use crate::instruction::{Action, Instruction};

/// Contract kind backing authorization documents.
pub const DARC_CONTRACT: &str = "darc";

/// Argument holding the encoded document.
pub const DARC_ARGUMENT: &str = "darc";

impl Instruction {
    /// True if this is a Spawn of the `darc` contract.
    pub fn spawns_darc(&self) -> bool {
        matches!(&self.action, Action::Spawn { contract_kind, .. } if contract_kind == DARC_CONTRACT)
    }

    /// The version-0 document this instruction bootstraps, if any.
    ///
    /// Requires a Spawn of `darc` whose `darc` argument decodes to a version-0
    /// document with `base_id` equal to the target's darc id.
    pub fn genesis_darc(&self) -> Option<Darc> {
        let Action::Spawn {
            contract_kind,
            args,
        } = &self.action
        else {
            return None;
        };
        if contract_kind != DARC_CONTRACT {
            return None;
        }
        let darc = Darc::from_bytes(args.search(DARC_ARGUMENT)?).ok()?;
        (darc.version == 0 && darc.base_id() == self.instance_id.darc_id).then_some(darc)
    }

    /// Verify against the document being spawned.
    ///
    /// `spawn:darc` is evaluated when the document has that rule; otherwise
    /// the document's `_sign` rule authorizes its own creation.
    pub fn verify_genesis(&self, darc: &Darc) -> omniledger_darc::Result<()> {
        let mut request = self.to_request();
        if self.spawns_darc() && !darc.rules.contains(&request.action) {
            request.action = SIGN_ACTION.to_string();
        }
        request.verify(darc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Arguments;
    use omniledger_core::{DarcId, InstanceId, Keypair, Nonce, Signer, SubId};
    use omniledger_darc::{spawn_action, DarcError, Expression, Rules};

    fn spawn_self(darc: &Darc) -> Instruction {
        Instruction::spawn(
            InstanceId::new(darc.base_id(), SubId::from_label("genesis")),
            DARC_CONTRACT,
            Arguments::new().with(DARC_ARGUMENT, darc.to_bytes().unwrap()),
            Nonce::from_label("genesis"),
        )
    }

    #[test]
    fn test_genesis_darc_extracted() {
        let owner = Keypair::from_seed(&[1; 32]);
        let darc = Darc::new(Rules::init(&[owner.identity()], &[owner.identity()]), "g");
        let instr = spawn_self(&darc);
        assert_eq!(instr.genesis_darc(), Some(darc));
    }

    #[test]
    fn test_genesis_darc_requires_matching_address() {
        let owner = Keypair::from_seed(&[1; 32]);
        let darc = Darc::new(Rules::init(&[owner.identity()], &[owner.identity()]), "g");
        let mut instr = spawn_self(&darc);
        instr.instance_id.darc_id = DarcId::from_label("elsewhere");
        assert_eq!(instr.genesis_darc(), None);
    }

    #[test]
    fn test_sign_fallback_when_spawn_rule_absent() {
        let owner = Keypair::from_seed(&[1; 32]);
        let darc = Darc::new(Rules::init(&[owner.identity()], &[owner.identity()]), "g");
        let mut instr = spawn_self(&darc);
        instr.sign_by(&owner).unwrap();

        assert!(matches!(instr.verify(&darc), Err(DarcError::RuleNotFound { .. })));
        instr.verify_genesis(&darc).unwrap();
    }

    #[test]
    fn test_spawn_rule_takes_precedence() {
        let owner = Keypair::from_seed(&[1; 32]);
        let other = Keypair::from_seed(&[2; 32]);
        let rules = Rules::init(&[owner.identity()], &[owner.identity()])
            .with_rule(spawn_action(DARC_CONTRACT), Expression::Id(other.identity()))
            .unwrap();
        let darc = Darc::new(rules, "g");
        let mut instr = spawn_self(&darc);
        instr.sign_by(&owner).unwrap();

        assert!(matches!(
            instr.verify_genesis(&darc),
            Err(DarcError::Unauthorized { .. })
        ));
    }
}
