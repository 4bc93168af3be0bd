//! Golden test vectors for deterministic verification.
//!
//! Each vector fixes an owner seed, a document description and a label, and
//! pins every derived output: the darc id, the exact signed payload of the
//! genesis spawn, its hash and its (deterministic) Ed25519 signature. Another
//! implementation given the same inputs must reproduce these bytes.

use serde::Serialize;

use omniledger_core::{InstanceId, Keypair, Nonce, Signer, SubId};
use omniledger_darc::{Darc, Rules};
use omniledger_tx::{Arguments, Instruction, DARC_ARGUMENT, DARC_CONTRACT};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    /// Darc description.
    pub description: &'static [u8],
    /// Label the instruction's sub id and nonce are derived from.
    pub label: &'static str,

    // Expected outputs, hex
    pub darc_id: &'static str,
    pub signed_payload: &'static str,
    pub instruction_hash: &'static str,
    pub signature: &'static str,
}

/// Outputs derived from a vector, as exchanged with other implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorOutput {
    pub name: String,
    pub owner: String,
    pub darc_id: String,
    pub signed_payload: String,
    pub instruction_hash: String,
    pub signature: String,
}

impl VectorOutput {
    /// Names of the outputs that differ from the vector's pinned values.
    pub fn mismatches(&self, vector: &GoldenVector) -> Vec<&'static str> {
        [
            ("darc_id", self.darc_id.as_str(), vector.darc_id),
            ("signed_payload", self.signed_payload.as_str(), vector.signed_payload),
            ("instruction_hash", self.instruction_hash.as_str(), vector.instruction_hash),
            ("signature", self.signature.as_str(), vector.signature),
        ]
        .into_iter()
        .filter(|(_, got, expected)| got != expected)
        .map(|(field, _, _)| field)
        .collect()
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "single owner genesis",
            seed: [0x42; 32],
            description: b"genesis darc",
            label: "darc",
            darc_id: "cea14334aa547b3fd1af0d97749f84cdc201f65c8ca253ac856526f7d9bcea6c",
            signed_payload: concat!(
                "8578196f6d6e696c65646765722f696e737472756374696f6e2f76315840cea1",
                "4334aa547b3fd1af0d97749f84cdc201f65c8ca253ac856526f7d9bcea6c6461",
                "7263000000000000000000000000000000000000000000000000000000000082",
                "64646172638182646461726358e6a56776657273696f6e006b64657363726970",
                "74696f6e4c67656e65736973206461726367626173655f6964f667707265765f",
                "6964f66572756c6573a2655f7369676ea1624964a16745643235353139982018",
                "21185218f818d1189b1879181d182418451832184218e1185f182e18ab186c18",
                "b718cf18fa187b186a185e18d300189718960e061898188118db126d696e766f",
                "6b653a65766f6c7665a1624964a1674564323535313998201821185218f818d1",
                "189b1879181d182418451832184218e1185f182e18ab186c18b718cf18fa187b",
                "186a185e18d300189718960e061898188118db12582064617263000000000000",
                "00000000000000000000000000000000000000000000",
            ),
            instruction_hash: "af58c11561d639c4b2b9c108a154199c05a446a927695641bcdc9a6cc419014d",
            signature: concat!(
                "86c7b9962d8623dc57807d3e427de2ce5fb4e5d24dcda2bcbe5f4c1e7449eaa3",
                "3adea9c8ca4be239c008b03b561681addce0c468ee9a8ca77d72cfed0a77f105",
            ),
        },
        GoldenVector {
            name: "empty description",
            seed: [0x42; 32],
            description: b"",
            label: "darc",
            darc_id: "99be8316e9344e87eb9557b774be5e58b2c332c36e069e3b026bff70e44a7d35",
            signed_payload: concat!(
                "8578196f6d6e696c65646765722f696e737472756374696f6e2f7631584099be",
                "8316e9344e87eb9557b774be5e58b2c332c36e069e3b026bff70e44a7d356461",
                "7263000000000000000000000000000000000000000000000000000000000082",
                "64646172638182646461726358daa56776657273696f6e006b64657363726970",
                "74696f6e4067626173655f6964f667707265765f6964f66572756c6573a2655f",
                "7369676ea1624964a1674564323535313998201821185218f818d1189b187918",
                "1d182418451832184218e1185f182e18ab186c18b718cf18fa187b186a185e18",
                "d300189718960e061898188118db126d696e766f6b653a65766f6c7665a16249",
                "64a1674564323535313998201821185218f818d1189b1879181d182418451832",
                "184218e1185f182e18ab186c18b718cf18fa187b186a185e18d300189718960e",
                "061898188118db12582064617263000000000000000000000000000000000000",
                "00000000000000000000",
            ),
            instruction_hash: "e5913976f93800444568b86c2897dc94d0d62ea0cacafe1679063e97c432cdf2",
            signature: concat!(
                "706524bbaf3d8736b52de5763c47e9b86e7183c36004495b8db30ab437b1c221",
                "a70c6595733e552b85beded64d2f71a5b580b016a5e7c0c072dbfc3eb67ca50b",
            ),
        },
        GoldenVector {
            name: "zero seed",
            seed: [0x00; 32],
            description: b"genesis darc",
            label: "genesis",
            darc_id: "c78cc3bf23087599521c6015845b3c2f0fbab7d3c86a38eb99c21ed7bee21961",
            signed_payload: concat!(
                "8578196f6d6e696c65646765722f696e737472756374696f6e2f76315840c78c",
                "c3bf23087599521c6015845b3c2f0fbab7d3c86a38eb99c21ed7bee219616765",
                "6e65736973000000000000000000000000000000000000000000000000000082",
                "64646172638182646461726358eaa56776657273696f6e006b64657363726970",
                "74696f6e4c67656e65736973206461726367626173655f6964f667707265765f",
                "6964f66572756c6573a2655f7369676ea1624964a16745643235353139982018",
                "3b186a182718bc18ce18b618a4182d186218a318a818d0182a186f0d18731865",
                "1832151877181d18e2184318a6183a18c0184818a1188b185918da18296d696e",
                "766f6b653a65766f6c7665a1624964a167456432353531399820183b186a1827",
                "18bc18ce18b618a4182d186218a318a818d0182a186f0d187318651832151877",
                "181d18e2184318a6183a18c0184818a1188b185918da1829582067656e657369",
                "7300000000000000000000000000000000000000000000000000",
            ),
            instruction_hash: "60cc1a2dabf3c55cb6b1d0cdf5cbc864050413c558bf3adc3f0802b4fe9a5ee9",
            signature: concat!(
                "848e10cdf2b1f714243883101494a9da81b556a26d9ea5abaa48b3b471e5473c",
                "1ac9d26aaa3605ac192f82e77aad10fdb3b16d71fbb11f5c1fb329e8ac261b0d",
            ),
        },
    ]
}

/// The genesis darc described by a vector.
pub fn darc_from_vector(vector: &GoldenVector) -> Darc {
    let owner = Keypair::from_seed(&vector.seed).identity();
    Darc::new(Rules::init(&[owner], &[owner]), vector.description)
}

/// The signed genesis spawn described by a vector.
pub fn instruction_from_vector(vector: &GoldenVector) -> Instruction {
    let keypair = Keypair::from_seed(&vector.seed);
    let darc = darc_from_vector(vector);
    let mut instruction = Instruction::spawn(
        InstanceId::new(darc.base_id(), SubId::from_label(vector.label)),
        DARC_CONTRACT,
        Arguments::new().with(DARC_ARGUMENT, darc.to_bytes().expect("darc encodes")),
        Nonce::from_label(vector.label),
    );
    instruction
        .sign_by(&keypair)
        .expect("ed25519 signing is infallible");
    instruction
}

/// Derive every output of a vector.
pub fn output_from_vector(vector: &GoldenVector) -> VectorOutput {
    let darc = darc_from_vector(vector);
    let instruction = instruction_from_vector(vector);
    VectorOutput {
        name: vector.name.to_string(),
        owner: Keypair::from_seed(&vector.seed).identity().to_string(),
        darc_id: darc.id().to_hex(),
        signed_payload: hex::encode(instruction.to_signed_payload()),
        instruction_hash: instruction.hash().to_hex(),
        signature: hex::encode(&instruction.signatures[0].signature),
    }
}

/// Check every vector against its pinned outputs.
///
/// Returns `(name, mismatched fields)` per vector; an empty list means the
/// vector reproduced exactly.
pub fn verify_all_vectors() -> Vec<(String, Vec<&'static str>)> {
    all_vectors()
        .iter()
        .map(|v| (v.name.to_string(), output_from_vector(v).mismatches(v)))
        .collect()
}

/// All vector outputs as pretty-printed JSON.
pub fn vectors_json() -> serde_json::Result<String> {
    let outputs: Vec<VectorOutput> = all_vectors().iter().map(output_from_vector).collect();
    serde_json::to_string_pretty(&outputs)
}
