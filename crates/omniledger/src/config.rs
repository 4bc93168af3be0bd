//! Configuration for the ledger, genesis assembly and deployment tooling.

use std::path::Path;

use serde::{Deserialize, Serialize};

use omniledger_darc::DEFAULT_MAX_DELEGATION_DEPTH;
use omniledger_skipchain::CURRENT_VERSION;

use crate::deploy::DeployError;

/// Configuration for the [`Ledger`](crate::Ledger).
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Whether to check signatures and rules before executing instructions.
    pub verify_signatures: bool,
    /// Maximum instructions in one transaction.
    pub max_instructions_per_transaction: usize,
    /// Maximum signatures on one instruction.
    pub max_signatures_per_instruction: usize,
    /// Bound on nested `darc:` identity resolution.
    pub max_delegation_depth: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            max_instructions_per_transaction: 64,
            max_signatures_per_instruction: 32,
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
        }
    }
}

/// Configuration for genesis assembly.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// Protocol version announced to the chain service.
    pub protocol_version: u32,
    /// Description stored in the genesis darc.
    pub description: Vec<u8>,
    /// Additional actions granted to the genesis signers, e.g. `spawn:value`.
    pub extra_rules: Vec<String>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            protocol_version: CURRENT_VERSION,
            description: b"genesis darc".to_vec(),
            extra_rules: Vec::new(),
        }
    }
}

/// Parameters of a testbed deployment.
///
/// `build`, `machines` and `loggers` are used locally by
/// [`prepare`](crate::deploy::prepare); `user` and `host` name the gateway.
/// Everything else is forwarded to the runner as [`runner_args`](Self::runner_args).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Branching factor of the node tree.
    pub branching_factor: usize,
    /// Logical nodes per physical host.
    pub hosts_per_node: usize,
    /// Messages sent per round.
    pub messages: usize,
    /// Message rate; negative means unlimited.
    pub rate: i64,
    pub debug: u8,
    /// Number of nodes that fail.
    pub failures: u32,
    /// Rounds after which the root fails.
    pub root_fail_rounds: u32,
    /// Rounds after which followers fail.
    pub follower_fail_rounds: u32,
    pub rounds: u32,
    /// Kill all running processes instead of deploying.
    pub kill: bool,
    /// Machines running nodes.
    pub machines: usize,
    /// Machines running log servers.
    pub loggers: usize,
    pub test_connect: bool,
    /// Application to run.
    pub app: String,
    /// Cryptographic suite.
    pub suite: String,
    /// Build every helper before deploying.
    pub build: bool,
    pub user: String,
    pub host: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            branching_factor: 2,
            hosts_per_node: 1,
            messages: 100,
            rate: -1,
            debug: 2,
            failures: 0,
            root_fail_rounds: 0,
            follower_fail_rounds: 0,
            rounds: 100,
            kill: false,
            machines: 20,
            loggers: 3,
            test_connect: false,
            app: "sign".to_string(),
            suite: "ed25519".to_string(),
            build: false,
            user: String::new(),
            host: "users.deterlab.net".to_string(),
        }
    }
}

impl DeployConfig {
    /// Parse from TOML; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, DeployError> {
        toml::from_str(content).map_err(|e| DeployError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Total hosts a deployment needs.
    pub fn hosts_needed(&self) -> usize {
        self.machines + self.loggers
    }

    /// `user@host` of the testbed gateway.
    pub fn gateway(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Command-line flags for the runner started on the gateway.
    pub fn runner_args(&self) -> Vec<String> {
        vec![
            format!("-nmsgs={}", self.messages),
            format!("-hpn={}", self.hosts_per_node),
            format!("-bf={}", self.branching_factor),
            format!("-rate={}", self.rate),
            format!("-rounds={}", self.rounds),
            format!("-debug={}", self.debug),
            format!("-failures={}", self.failures),
            format!("-rfail={}", self.root_fail_rounds),
            format!("-ffail={}", self.follower_fail_rounds),
            format!("-test_connect={}", self.test_connect),
            format!("-app={}", self.app),
            format!("-suite={}", self.suite),
            format!("-kill={}", self.kill),
        ]
    }
}
