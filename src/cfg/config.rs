// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::client::{ClientConfig, config::DEFAULT_HIGH_WATER_MARK};

/// Top-level file-loaded configuration: the cluster's remotes, its
/// connection tunables, an optional TLS stanza, and an optional logger
/// stanza.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub logger: Option<String>,
}

/// The set of remotes to dial and the per-connection timeouts to apply to
/// each of them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClusterConfig {
    /// Addresses in `host:port` form, dialed in parallel by `Cluster::dial`.
    pub remotes: Vec<String>,

    #[serde(with = "serde_secs", default = "default_dial_timeout")]
    pub dial_timeout: Duration,

    #[serde(with = "serde_secs", default = "default_call_timeout")]
    pub call_timeout: Duration,

    #[serde(with = "serde_secs", default = "default_io_timeout")]
    pub io_timeout: Duration,

    /// Bound shared by each connection's waiter free list and writer queue.
    #[serde(default = "default_high_water_mark")]
    pub high_water_mark: usize,
}

fn default_dial_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_io_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_high_water_mark() -> usize {
    DEFAULT_HIGH_WATER_MARK
}

/// Accepted and validated but never opened: TLS session setup is an
/// external collaborator's concern, not this crate's.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
    #[serde(default)]
    pub ca_path: Option<String>,
}

impl Config {
    /// Load the configuration from YAML, validate it, and return the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validate invariants and normalize derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.cluster.remotes.is_empty(),
            "cluster.remotes must list at least one address"
        );
        for remote in &self.cluster.remotes {
            ensure!(!remote.is_empty(), "cluster.remotes entries must not be empty");
        }
        if let Some(tls) = &self.tls {
            ensure!(!tls.cert_path.is_empty(), "tls.cert_path must not be empty");
            ensure!(!tls.key_path.is_empty(), "tls.key_path must not be empty");
        }
        ensure!(
            self.cluster.dial_timeout > Duration::ZERO,
            "cluster.dial_timeout must be positive"
        );
        ensure!(
            self.cluster.call_timeout > Duration::ZERO,
            "cluster.call_timeout must be positive"
        );
        ensure!(
            self.cluster.io_timeout > Duration::ZERO,
            "cluster.io_timeout must be positive"
        );
        ensure!(
            self.cluster.high_water_mark > 0,
            "cluster.high_water_mark must be positive"
        );
        Ok(())
    }

    /// Derive the per-connection tunables every dialed `Client` should use.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            dial_timeout: self.cluster.dial_timeout,
            call_timeout: self.cluster.call_timeout,
            io_timeout: self.cluster.io_timeout,
            high_water_mark: self.cluster.high_water_mark,
        }
    }
}

/// Serde helper for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
