// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-connection session state (§3).
//!
//! A session survives across many requests: the configuration a `CNFG` chunk establishes
//! stays in effect for every later request that doesn't carry its own `CNFG`, and open
//! file handles outlive any single `RIFF` message.

use crate::config::HostConfig;
use crate::proto::Errno;

/// State a [`crate::processor::Processor`] carries between requests on the same
/// connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Session {
    config: Option<HostConfig>,
    /// The `errno` of the most recently failed operation, retrieved by `GET_ERRNO` the
    /// same way a libc `errno` survives until the next call that sets it.
    last_errno: Option<Errno>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self { config: None, last_errno: None }
    }

    #[must_use]
    pub const fn config(&self) -> Option<HostConfig> {
        self.config
    }

    /// Records `config` as the session's configuration, as observed in a `CNFG` chunk.
    pub fn set_config(&mut self, config: HostConfig) {
        self.config = Some(config);
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Records the `errno` of a failed operation for later retrieval by `GET_ERRNO`.
    pub fn set_last_errno(&mut self, errno: Errno) {
        self.last_errno = Some(errno);
    }

    #[must_use]
    pub fn last_errno(&self) -> Option<Errno> {
        self.last_errno
    }
}
