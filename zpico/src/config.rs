//
// Copyright (c) 2023 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//

//! Configuration of a zpico session.
//!
//! A [`Config`] can be built in code, parsed from a JSON5 string, or loaded from a `.json` /
//! `.json5` file whose path is given directly or through the `ZPICO_CONFIG` environment
//! variable. Every field has a default, so a configuration file only needs to carry the
//! values it overrides.
//!
//! ```
//! let config = zpico::config::Config::from_json5(
//!     r#"{ mode: "client", transport: { lease_ms: 5000 } }"#,
//! )
//! .unwrap();
//! assert_eq!(config.transport.lease_ms, 5000);
//! ```
use std::{fmt, io::Read, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use zpico_protocol::{
    core::{WhatAmI, WhatAmIMatcher, ZenohId},
    transport::{batch_size, BatchSize},
};
use zpico_result::{bail, errno, zerror, ZResult};

pub mod defaults {
    use super::*;

    pub const ENV: &str = "ZPICO_CONFIG";

    pub const MODE: WhatAmI = WhatAmI::Client;
    pub const SCOUTING_TIMEOUT_MS: u64 = 1_000;
    pub const LEASE_MS: u64 = 10_000;
    pub const KEEP_ALIVE: u32 = 4;
    pub const BATCH_SIZE: BatchSize = batch_size::UNICAST;
    pub const SN_RESOLUTION: u8 = 32;
    pub const QUERIES_DEFAULT_TIMEOUT_MS: u64 = 10_000;
    pub const RING_CAPACITY: usize = 256;
    pub const FIFO_CAPACITY: usize = 256;
    pub const READ_TASK_NAME: &str = "zpico-read";
    pub const LEASE_TASK_NAME: &str = "zpico-lease";

    pub fn scouting_what() -> WhatAmIMatcher {
        WhatAmI::Router | WhatAmI::Peer
    }
}

/// The configuration of a zpico session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The identifier of this node. A random one is generated when absent.
    pub id: Option<ZenohId>,
    /// Either `client` or `peer`.
    pub mode: WhatAmI,
    pub connect: ConnectConf,
    pub scouting: ScoutingConf,
    pub transport: TransportConf,
    /// Timeout applied to queries that do not set one.
    pub queries_default_timeout_ms: u64,
    pub interests: InterestsConf,
    pub timestamping: TimestampingConf,
    pub tasks: TasksConf,
    pub handlers: HandlersConf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectConf {
    /// Endpoints handed to the link layer verbatim, e.g. `tcp/192.168.1.1:7447`.
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoutingConf {
    pub what: WhatAmIMatcher,
    pub timeout_ms: u64,
}

impl Default for ScoutingConf {
    fn default() -> Self {
        Self {
            what: defaults::scouting_what(),
            timeout_ms: defaults::SCOUTING_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConf {
    /// Time after which a silent peer is considered dead.
    pub lease_ms: u64,
    /// Number of keep-alive messages sent per lease period.
    pub keep_alive: u32,
    /// Maximum size of a batch on the wire, length prefix included.
    pub batch_size: BatchSize,
    /// Width in bits of the frame sequence numbers: 8, 16 or 32.
    pub sn_resolution: u8,
}

impl Default for TransportConf {
    fn default() -> Self {
        Self {
            lease_ms: defaults::LEASE_MS,
            keep_alive: defaults::KEEP_ALIVE,
            batch_size: defaults::BATCH_SIZE,
            sn_resolution: defaults::SN_RESOLUTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterestsConf {
    /// Whether publishers install a write filter.
    pub enabled: bool,
}

impl Default for InterestsConf {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimestampingConf {
    /// Whether outgoing data is stamped with the session clock.
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConf {
    pub name: Option<String>,
    pub stack_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TasksConf {
    pub read: TaskConf,
    pub lease: TaskConf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlersConf {
    pub ring_capacity: usize,
    pub fifo_capacity: usize,
}

impl Default for HandlersConf {
    fn default() -> Self {
        Self {
            ring_capacity: defaults::RING_CAPACITY,
            fifo_capacity: defaults::FIFO_CAPACITY,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: None,
            mode: defaults::MODE,
            connect: ConnectConf::default(),
            scouting: ScoutingConf::default(),
            transport: TransportConf::default(),
            queries_default_timeout_ms: defaults::QUERIES_DEFAULT_TIMEOUT_MS,
            interests: InterestsConf::default(),
            timestamping: TimestampingConf::default(),
            tasks: TasksConf::default(),
            handlers: HandlersConf::default(),
        }
    }
}

impl Config {
    pub fn client() -> Self {
        Self::default()
    }

    pub fn peer() -> Self {
        Self {
            mode: WhatAmI::Peer,
            ..Self::default()
        }
    }

    pub fn from_json5(input: &str) -> ZResult<Self> {
        let config: Config = json5::from_str(input)
            .map_err(|e| zerror!((errno::INVALID_CONFIG) "JSON error: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> ZResult<Self> {
        let path = std::env::var(defaults::ENV).map_err(
            |e| zerror!((errno::INVALID_CONFIG) "Invalid ENV variable ({}): {}", defaults::ENV, e),
        )?;
        Self::from_file(path.as_str())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ZResult<Self> {
        let path = path.as_ref();
        let mut f = std::fs::File::open(path)
            .map_err(|e| zerror!((errno::INVALID_CONFIG) e => "Unable to open {}", path.display()))?;
        let mut content = String::new();
        f.read_to_string(&mut content)
            .map_err(|e| zerror!((errno::INVALID_CONFIG) e => "Unable to read {}", path.display()))?;
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") | Some("json5") => Self::from_json5(&content),
            Some(other) => bail!(
                (errno::INVALID_CONFIG)
                "Unsupported file type '.{}' (.json and .json5 are supported)",
                other
            ),
            None => bail!(
                (errno::INVALID_CONFIG)
                "Unsupported file type. Configuration files must have an extension (.json and .json5 supported)"
            ),
        }
    }

    /// Check the cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ZResult<()> {
        if self.mode == WhatAmI::Router {
            bail!((errno::INVALID_CONFIG) "Mode 'router' is not supported by an edge client");
        }
        let t = &self.transport;
        if t.lease_ms == 0 {
            bail!((errno::INVALID_CONFIG) "transport.lease_ms must be strictly positive");
        }
        if t.keep_alive == 0 || u64::from(t.keep_alive) > t.lease_ms {
            bail!(
                (errno::INVALID_CONFIG)
                "transport.keep_alive must be in 1..={}, got {}",
                t.lease_ms,
                t.keep_alive
            );
        }
        if (t.batch_size as usize) < zpico_codec::transport::batch::LENGTH_BYTES + 1 {
            bail!((errno::INVALID_CONFIG) "transport.batch_size {} is too small", t.batch_size);
        }
        if !matches!(t.sn_resolution, 8 | 16 | 32) {
            bail!(
                (errno::INVALID_CONFIG)
                "transport.sn_resolution must be 8, 16 or 32, got {}",
                t.sn_resolution
            );
        }
        if self.handlers.ring_capacity == 0 {
            bail!((errno::INVALID_CONFIG) "handlers.ring_capacity must be strictly positive");
        }
        for (name, task) in [("read", &self.tasks.read), ("lease", &self.tasks.lease)] {
            if task.stack_size == Some(0) {
                bail!((errno::INVALID_CONFIG) "tasks.{}.stack_size must be strictly positive", name);
            }
        }
        Ok(())
    }

    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.transport.lease_ms)
    }

    /// Interval between two keep-alive checks.
    pub fn keep_alive_interval(&self) -> Duration {
        self.lease() / self.transport.keep_alive
    }

    pub fn queries_default_timeout(&self) -> Duration {
        Duration::from_millis(self.queries_default_timeout_ms)
    }

    pub(crate) fn sn_mask(&self) -> u32 {
        match self.transport.sn_resolution {
            8 => u8::MAX as u32,
            16 => u16::MAX as u32,
            _ => u32::MAX,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => fmt::Debug::fmt(self, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use zpico_result::ErrNo;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.mode, WhatAmI::Client);
        assert_eq!(config.keep_alive_interval(), Duration::from_millis(2_500));
        assert_eq!(config.sn_mask(), u32::MAX);
        assert!(config.interests.enabled);
    }

    #[test]
    fn partial_json5() {
        let config = Config::from_json5(
            r#"{
                // Only the overridden fields
                mode: "peer",
                scouting: { what: "router" },
                transport: { lease_ms: 3000, keep_alive: 3, sn_resolution: 16 },
                tasks: { read: { name: "rx", stack_size: 8192 } },
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, WhatAmI::Peer);
        assert_eq!(config.scouting.what, WhatAmIMatcher::empty().router());
        assert_eq!(config.scouting.timeout_ms, defaults::SCOUTING_TIMEOUT_MS);
        assert_eq!(config.keep_alive_interval(), Duration::from_secs(1));
        assert_eq!(config.sn_mask(), u16::MAX as u32);
        assert_eq!(config.tasks.read.name.as_deref(), Some("rx"));
        assert_eq!(config.tasks.lease, TaskConf::default());
    }

    #[test]
    fn invalid_values() {
        for input in [
            r#"{ mode: "router" }"#,
            r#"{ transport: { lease_ms: 0 } }"#,
            r#"{ transport: { keep_alive: 0 } }"#,
            r#"{ transport: { sn_resolution: 12 } }"#,
            r#"{ handlers: { ring_capacity: 0 } }"#,
            r#"{ tasks: { lease: { stack_size: 0 } } }"#,
            r#"{ unknown_field: 1 }"#,
            r#"{ mode: "broker" }"#,
        ] {
            let e = Config::from_json5(input).unwrap_err();
            assert_eq!(e.errno().get(), errno::INVALID_CONFIG, "{input}");
        }
    }

    #[test]
    fn from_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("zpico-config-{}.json5", std::process::id()));
        std::fs::write(&path, r#"{ queries_default_timeout_ms: 250 }"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.queries_default_timeout(), Duration::from_millis(250));
        std::fs::remove_file(&path).unwrap();

        let path = dir.join(format!("zpico-config-{}.yaml", std::process::id()));
        std::fs::write(&path, "mode: client").unwrap();
        assert!(Config::from_file(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn display_is_json() {
        let config = Config::peer();
        let text = config.to_string();
        let back: Config = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
