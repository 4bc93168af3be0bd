//! Deployment tooling: host selection and parallel builds for testbed runs.
//!
//! A host file lists hosts two lines at a time, the physical name followed
//! by its virtual (experiment-internal) name. A deployment takes the first
//! `loggers + machines` pairs; the first of those runs the master logger.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::DeployConfig;

/// Errors from the deployment tooling. Fatal to the operation that raised them.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("need {needed} hosts but only {available} are listed")]
    NotEnoughHosts { needed: usize, available: usize },

    #[error("malformed host list: {0}")]
    MalformedHostList(String),

    #[error("invalid deploy config: {0}")]
    InvalidConfig(String),

    #[error("build of {target} failed: {reason}")]
    BuildFailed { target: String, reason: String },

    /// A build task panicked or was cancelled.
    #[error("build task failed: {0}")]
    Join(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A physical host and its virtual name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPair {
    pub physical: String,
    pub virtual_name: String,
}

/// Hosts available to a deployment, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostList {
    hosts: Vec<HostPair>,
}

impl HostList {
    /// Parse alternating physical/virtual lines. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, DeployError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() % 2 != 0 {
            return Err(DeployError::MalformedHostList(format!(
                "{} lines, expected physical/virtual pairs",
                lines.len()
            )));
        }
        let hosts = lines
            .chunks_exact(2)
            .map(|pair| HostPair {
                physical: pair[0].to_string(),
                virtual_name: pair[1].to_string(),
            })
            .collect();
        Ok(Self { hosts })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostPair> {
        self.hosts.iter()
    }

    /// Choose `loggers` logger hosts followed by `machines` node hosts.
    pub fn select(&self, machines: usize, loggers: usize) -> Result<Selection, DeployError> {
        let needed = machines + loggers;
        if needed > self.hosts.len() {
            return Err(DeployError::NotEnoughHosts {
                needed,
                available: self.hosts.len(),
            });
        }
        let master_logger = self
            .hosts
            .first()
            .map(|h| h.physical.clone())
            .ok_or(DeployError::NotEnoughHosts {
                needed: 1,
                available: 0,
            })?;
        let (loggers, rest) = self.hosts[..needed].split_at(loggers);
        Ok(Selection {
            master_logger,
            loggers: loggers.to_vec(),
            machines: rest.to_vec(),
        })
    }
}

/// Hosts chosen for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Physical name of the first selected host.
    pub master_logger: String,
    pub loggers: Vec<HostPair>,
    pub machines: Vec<HostPair>,
}

impl Selection {
    fn all(&self) -> impl Iterator<Item = &HostPair> {
        self.loggers.iter().chain(self.machines.iter())
    }

    /// Selected physical names, one per line.
    pub fn physical_list(&self) -> String {
        self.all()
            .map(|h| h.physical.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Selected virtual names, one per line, aligned with [`physical_list`](Self::physical_list).
    pub fn virtual_list(&self) -> String {
        self.all()
            .map(|h| h.virtual_name.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write `phys.txt` and `virt.txt` into `dir`.
    pub fn write_host_files(&self, dir: impl AsRef<Path>) -> Result<(), DeployError> {
        let dir = dir.as_ref();
        std::fs::write(dir.join("phys.txt"), self.physical_list())?;
        std::fs::write(dir.join("virt.txt"), self.virtual_list())?;
        Ok(())
    }
}

/// Everything needed to start a run on the testbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub selection: Selection,
    /// `user@host` the runner is started on.
    pub gateway: String,
    /// Flags for the runner, see [`DeployConfig::runner_args`].
    pub runner_args: Vec<String>,
}

/// One executable to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub package: String,
    pub os: String,
    pub arch: String,
}

impl BuildTarget {
    pub fn new(package: &str, os: &str, arch: &str) -> Self {
        Self {
            package: package.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// The helpers every deployment ships.
    pub fn default_targets() -> Vec<BuildTarget> {
        let mut targets: Vec<BuildTarget> = ["logserver", "timeclient", "forkexec", "exec"]
            .into_iter()
            .map(|pkg| BuildTarget::new(pkg, "linux", "amd64"))
            .collect();
        targets.push(BuildTarget::new("deter", "freebsd", "386"));
        targets
    }
}

impl std::fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/{})", self.package, self.os, self.arch)
    }
}

/// Builds one target.
#[async_trait]
pub trait Builder: Send + Sync + 'static {
    async fn build(&self, target: &BuildTarget) -> Result<(), DeployError>;
}

/// Build every target concurrently.
///
/// Returns the first failure; targets still building at that point are aborted.
pub async fn build_all<B: Builder>(
    builder: Arc<B>,
    targets: Vec<BuildTarget>,
) -> Result<(), DeployError> {
    let mut set = JoinSet::new();
    for target in targets {
        let builder = Arc::clone(&builder);
        set.spawn(async move {
            debug!(build = %target, "building");
            builder.build(&target).await
        });
    }

    while let Some(joined) = set.join_next().await {
        let outcome = joined
            .map_err(|e| DeployError::Join(e.to_string()))
            .and_then(|built| built);
        if let Err(e) = outcome {
            warn!(error = %e, "build failed, aborting remaining builds");
            set.abort_all();
            return Err(e);
        }
    }
    Ok(())
}

/// Build if requested, select hosts and assemble the runner invocation.
pub async fn prepare<B: Builder>(
    config: &DeployConfig,
    hosts: &HostList,
    builder: Arc<B>,
) -> Result<Deployment, DeployError> {
    if config.build {
        build_all(builder, BuildTarget::default_targets()).await?;
    }
    let selection = hosts.select(config.machines, config.loggers)?;
    info!(
        master_logger = %selection.master_logger,
        machines = selection.machines.len(),
        loggers = selection.loggers.len(),
        "hosts selected"
    );

    let deployment = Deployment {
        selection,
        gateway: config.gateway(),
        runner_args: config.runner_args(),
    };
    debug!(
        gateway = %deployment.gateway,
        args = %deployment.runner_args.join(" "),
        "runner prepared"
    );
    Ok(deployment)
}
