use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use fmcwcore::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// UDP address the front-end streams to.
    pub bind_addr: SocketAddr,
    /// HTTP address of the polling bridge.
    pub http_addr: SocketAddr,
    pub queue_capacity: usize,
    pub tick_ms: u64,
    pub max_datagram_len: usize,
    pub pipeline: PipelineConfig,
    pub generator: GeneratorConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5005)),
            http_addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
            queue_capacity: 256,
            tick_ms: 50,
            max_datagram_len: 65_536,
            pipeline: PipelineConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl ReceiverConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading receiver config {}", path_ref.display()))?;
        let config: ReceiverConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing receiver config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating receiver config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.pipeline
            .validate()
            .context("invalid pipeline settings")?;
        anyhow::ensure!(self.tick_ms > 0, "tick_ms must be positive");
        anyhow::ensure!(
            self.max_datagram_len >= 4,
            "max_datagram_len {} cannot hold a discriminator",
            self.max_datagram_len
        );
        Ok(())
    }
}
