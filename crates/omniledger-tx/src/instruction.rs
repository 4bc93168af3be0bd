//! Instructions: the smallest signed unit of work.
//!
//! An instruction targets one instance, carries one action and a nonce, and
//! is signed over [`Instruction::to_signed_payload`]. The signature list is
//! not part of the payload; any other change invalidates every signature.

use bytes::Bytes;
use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use omniledger_core::canonical::{bytes, text, uint};
use omniledger_core::{encode_canonical, Blake3Hash, InstanceId, Nonce, Signature, Signer};
use omniledger_darc::{invoke_action, spawn_action, Darc, DarcResolver, Request};

use crate::error::Result;

const INSTRUCTION_DOMAIN: &str = "omniledger/instruction/v1";

/// Action name of a delete instruction.
pub const DELETE_ACTION: &str = "delete";

/// A named argument. Names need not be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: Bytes,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered argument list. Order is part of the signed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(pub Vec<Argument>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.0.push(Argument::new(name, value));
        self
    }

    /// Value of the first argument with this name.
    pub fn search(&self, name: &str) -> Option<&Bytes> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_canonical_value(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|a| Value::Array(vec![text(&a.name), bytes(&a.value)]))
                .collect(),
        )
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(args: Vec<Argument>) -> Self {
        Self(args)
    }
}

/// What an instruction does to its instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Create a new instance of a contract kind.
    Spawn {
        contract_kind: String,
        args: Arguments,
    },
    /// Call a command on an existing instance.
    Invoke { command: String, args: Arguments },
    /// Remove an existing instance.
    Delete,
}

impl Action {
    /// Rule name consulted for this action.
    pub fn action_name(&self) -> String {
        match self {
            Action::Spawn { contract_kind, .. } => spawn_action(contract_kind),
            Action::Invoke { command, .. } => invoke_action(command),
            Action::Delete => DELETE_ACTION.to_string(),
        }
    }

    /// Stable discriminant used in the signed payload.
    pub fn discriminant(&self) -> u64 {
        match self {
            Action::Spawn { .. } => 0,
            Action::Invoke { .. } => 1,
            Action::Delete => 2,
        }
    }

    /// Arguments carried by spawn and invoke; empty for delete.
    pub fn args(&self) -> Option<&Arguments> {
        match self {
            Action::Spawn { args, .. } | Action::Invoke { args, .. } => Some(args),
            Action::Delete => None,
        }
    }

    fn payload_value(&self) -> Value {
        match self {
            Action::Spawn {
                contract_kind,
                args,
            } => Value::Array(vec![text(contract_kind), args.to_canonical_value()]),
            Action::Invoke { command, args } => {
                Value::Array(vec![text(command), args.to_canonical_value()])
            }
            Action::Delete => Value::Array(vec![]),
        }
    }
}

/// A signed operation on one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub instance_id: InstanceId,
    pub action: Action,
    pub nonce: Nonce,
    pub signatures: Vec<Signature>,
}

impl Instruction {
    pub fn new(instance_id: InstanceId, action: Action, nonce: Nonce) -> Self {
        Self {
            instance_id,
            action,
            nonce,
            signatures: Vec::new(),
        }
    }

    pub fn spawn(
        instance_id: InstanceId,
        contract_kind: impl Into<String>,
        args: Arguments,
        nonce: Nonce,
    ) -> Self {
        Self::new(
            instance_id,
            Action::Spawn {
                contract_kind: contract_kind.into(),
                args,
            },
            nonce,
        )
    }

    pub fn invoke(
        instance_id: InstanceId,
        command: impl Into<String>,
        args: Arguments,
        nonce: Nonce,
    ) -> Self {
        Self::new(
            instance_id,
            Action::Invoke {
                command: command.into(),
                args,
            },
            nonce,
        )
    }

    pub fn delete(instance_id: InstanceId, nonce: Nonce) -> Self {
        Self::new(instance_id, Action::Delete, nonce)
    }

    pub fn action_name(&self) -> String {
        self.action.action_name()
    }

    /// The exact bytes every signer signs and every verifier recomputes.
    ///
    /// `[domain, instance_id, discriminant, payload, nonce]` in canonical CBOR.
    pub fn to_signed_payload(&self) -> Vec<u8> {
        encode_canonical(&Value::Array(vec![
            text(INSTRUCTION_DOMAIN),
            bytes(&self.instance_id.to_bytes()),
            uint(self.action.discriminant()),
            self.action.payload_value(),
            bytes(self.nonce.as_bytes()),
        ]))
    }

    /// Hash of the signed payload. Signatures do not contribute.
    pub fn hash(&self) -> Blake3Hash {
        Blake3Hash::hash(&self.to_signed_payload())
    }

    /// The whole instruction in canonical form: the signed payload followed
    /// by `[signer, signature]` pairs in signature order.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let signatures = self
            .signatures
            .iter()
            .map(|s| Value::Array(vec![bytes(&s.signer.canonical_bytes()), bytes(&s.signature)]))
            .collect();
        encode_canonical(&Value::Array(vec![
            bytes(&self.to_signed_payload()),
            Value::Array(signatures),
        ]))
    }

    /// Sign the payload and append the signature.
    pub fn sign_by(&mut self, signer: &dyn Signer) -> Result<Signature> {
        let sig = Signature::create(signer, &self.to_signed_payload())?;
        self.signatures.push(sig.clone());
        Ok(sig)
    }

    /// The authorization request this instruction makes against its document.
    pub fn to_request(&self) -> Request {
        Request::new(
            self.instance_id.darc_id,
            self.action_name(),
            self.to_signed_payload(),
            self.signatures.clone(),
        )
    }

    /// Verify signatures and the action rule against `darc`.
    pub fn verify(&self, darc: &Darc) -> omniledger_darc::Result<()> {
        self.to_request().verify(darc)
    }

    /// [`verify`](Self::verify) with `darc:` identity resolution.
    pub fn verify_with(
        &self,
        darc: &Darc,
        resolver: &dyn DarcResolver,
        max_depth: usize,
    ) -> omniledger_darc::Result<()> {
        self.to_request().verify_with(darc, resolver, max_depth)
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
