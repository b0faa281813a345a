//! Partitioner and device-stream settings.
//!
//! Defaults suit a single-node run. Each field can be overridden with a
//! `RANGESHUFFLE_*` environment variable or a `with_*` builder.

use crate::error::{Result, ShuffleError};
use crate::types::OutOfRangePolicy;

const OUT_OF_RANGE: &str = "RANGESHUFFLE_OUT_OF_RANGE";
const CHUNK_ITEMS: &str = "RANGESHUFFLE_CHUNK_ITEMS";
const DEVICE_THREADS: &str = "RANGESHUFFLE_DEVICE_THREADS";
const VERIFY_RECOUNT: &str = "RANGESHUFFLE_VERIFY_RECOUNT";

const VARS: [&str; 4] = [OUT_OF_RANGE, CHUNK_ITEMS, DEVICE_THREADS, VERIFY_RECOUNT];

/// Tuning parameters for the partitioner and its device stream.
#[derive(Debug, Clone)]
pub struct ShuffleConfig {
    /// Handling of keys outside the configured range.
    pub out_of_range: OutOfRangePolicy,

    /// Items per parallel-for work unit on the device path. Also the
    /// granularity of the order-preserving slot claim in the scatter pass.
    pub chunk_items: usize,

    /// Worker threads backing a `DeviceStream`. Zero means one per core.
    pub device_threads: usize,

    /// Compare the post-scatter recount against the first count.
    pub verify_recount: bool,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            out_of_range: OutOfRangePolicy::Clamp,
            chunk_items: 64 * 1024,
            device_threads: 0,
            verify_recount: true,
        }
    }
}

impl ShuffleConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Malformed values are logged and ignored. Use
    /// [`try_from_env`](Self::try_from_env) to surface them instead.
    ///
    /// Recognized variables:
    /// - `RANGESHUFFLE_OUT_OF_RANGE` (`clamp` or `reject`)
    /// - `RANGESHUFFLE_CHUNK_ITEMS` (at least 1)
    /// - `RANGESHUFFLE_DEVICE_THREADS` (0 = one per core)
    /// - `RANGESHUFFLE_VERIFY_RECOUNT` (`true`/`false`/`1`/`0`)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), but a set variable that fails to
    /// parse is an error.
    pub fn try_from_env() -> Result<Self> {
        Self::try_from_lookup(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        for var in VARS {
            if let Some(value) = lookup(var)
                && let Err(e) = cfg.apply(var, &value)
            {
                tracing::warn!(error = %e, "ignoring config override");
            }
        }
        cfg
    }

    /// [`try_from_env`](Self::try_from_env) over an arbitrary variable lookup.
    pub fn try_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        for var in VARS {
            if let Some(value) = lookup(var) {
                cfg.apply(var, &value)?;
            }
        }
        Ok(cfg)
    }

    /// Builder-style override of the out-of-range policy.
    pub fn with_out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.out_of_range = policy;
        self
    }

    /// Builder-style override of the device chunk size. Clamped to at least 1.
    pub fn with_chunk_items(mut self, chunk_items: usize) -> Self {
        self.chunk_items = chunk_items.max(1);
        self
    }

    /// Builder-style override of the device worker count.
    pub fn with_device_threads(mut self, threads: usize) -> Self {
        self.device_threads = threads;
        self
    }

    /// Set the field `var` controls, leaving `self` unchanged on a bad value.
    fn apply(&mut self, var: &'static str, value: &str) -> Result<()> {
        let invalid = || ShuffleError::config(var, value);
        match var {
            OUT_OF_RANGE => self.out_of_range = value.parse().map_err(|_| invalid())?,
            CHUNK_ITEMS => {
                self.chunk_items = match value.trim().parse::<usize>() {
                    Ok(n) if n > 0 => n,
                    _ => return Err(invalid()),
                }
            }
            DEVICE_THREADS => {
                self.device_threads = value.trim().parse().map_err(|_| invalid())?;
            }
            VERIFY_RECOUNT => self.verify_recount = parse_bool(value).ok_or_else(invalid)?,
            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
