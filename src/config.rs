//! Deserializable station configuration, loaded the way the teacher loads a
//! `Scene` (`serde::Deserialize` structs + `serde_json::from_str`) in
//! `common::scene`.
//!
//! `spec.md` §6 describes the control surface only as abstract commands; a
//! runnable station still needs a concrete way to seed initial class periods,
//! deadlines, types, counts, random-producer parameters, and TX-power
//! thresholds without hardcoding them. This module is that seed.

use std::fs;

use anyhow::Context;
use serde::Deserialize;

use crate::control::{MAX_THRESHOLD_MS, MIN_THRESHOLD_MS};
use crate::types::{ClassId, DataType};

/// Per-class static configuration (§3 "Class configuration").
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClassConfig {
    pub data_type: DataType,
    /// Period in milliseconds. `0` disables periodic firing for this class.
    pub period_ms: u64,
    pub relative_deadline_ms: u64,
    /// Target element count per production event.
    pub count_target: u32,
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            data_type: DataType::Int32,
            period_ms: 3000,
            relative_deadline_ms: 3000,
            count_target: 10,
        }
    }
}

/// Random (aperiodic) producer configuration (§4.2).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RandomProducerConfig {
    pub enabled: bool,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub burst_enabled: bool,
    pub burst_period_ms: u64,
    pub burst_interval_ms: u64,
    pub element_count: u32,
    pub data_type: DataType,
    /// Relative deadline for random-class packets (§6 `rdeadline` command).
    #[serde(default = "default_random_relative_deadline_ms")]
    pub relative_deadline_ms: u64,
}

fn default_random_relative_deadline_ms() -> u64 {
    1000
}

impl Default for RandomProducerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_ms: 500,
            max_interval_ms: 1500,
            burst_enabled: true,
            burst_period_ms: 5000,
            burst_interval_ms: 50,
            element_count: 4,
            data_type: DataType::Int16,
            relative_deadline_ms: default_random_relative_deadline_ms(),
        }
    }
}

impl RandomProducerConfig {
    /// §4.2 validation rule: `min_interval >= max_interval` is coerced rather
    /// than rejected, so a config file with a typo still produces a usable
    /// interval instead of failing to load.
    pub fn normalize(&mut self) {
        if self.min_interval_ms >= self.max_interval_ms {
            self.max_interval_ms = self.min_interval_ms + 1000;
        }
    }
}

/// TX-power controller thresholds and levels (§4.6). Values are illustrative
/// in `spec.md` but treated as part of the wire/behavioral interface and
/// preserved as defaults here; a config file may override them.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TxPowerConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub rssi_excellent: i8,
    pub rssi_good: i8,
    pub rssi_fair: i8,
}

impl Default for TxPowerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5000,
            rssi_excellent: -20,
            rssi_good: -30,
            rssi_fair: -50,
        }
    }
}

/// Top-level deserializable station configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_class_configs")]
    pub classes: [ClassConfig; 3],
    #[serde(default)]
    pub random: RandomProducerConfig,
    #[serde(default)]
    pub tx_power: TxPowerConfig,
    /// Processing horizon (§4.3 step 1). Clamped to
    /// `[MIN_THRESHOLD_MS, MAX_THRESHOLD_MS]` on load.
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: u64,
}

fn default_threshold_ms() -> u64 {
    1000
}

fn default_class_configs() -> [ClassConfig; 3] {
    [
        ClassConfig {
            data_type: DataType::Int32,
            period_ms: 3000,
            relative_deadline_ms: 3000,
            count_target: 10,
        },
        ClassConfig {
            data_type: DataType::Float32,
            period_ms: 5000,
            relative_deadline_ms: 5000,
            count_target: 8,
        },
        ClassConfig {
            data_type: DataType::Int16,
            period_ms: 6000,
            relative_deadline_ms: 6000,
            count_target: 6,
        },
    ]
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            classes: default_class_configs(),
            random: RandomProducerConfig::default(),
            tx_power: TxPowerConfig::default(),
            threshold_ms: default_threshold_ms(),
        }
    }
}

impl StationConfig {
    /// Clamp/normalize fields that the control surface would otherwise
    /// clamp on a `set`/`threshold` command (§6), applied once at load time.
    pub fn normalize(&mut self) {
        self.random.normalize();
        self.threshold_ms = self.threshold_ms.clamp(MIN_THRESHOLD_MS, MAX_THRESHOLD_MS);
    }

    /// Per-class config for a periodic class (`ClassA`/`ClassB`/`ClassC`).
    pub fn class(&self, class_id: ClassId) -> ClassConfig {
        self.classes[class_id.ordinal()]
    }

    /// Load and normalize a station configuration from a JSON file, the same
    /// read-then-parse-with-context shape as the teacher's own
    /// `common::scene::load_scene`.
    pub fn load_from_path(path: &str) -> anyhow::Result<StationConfig> {
        let data = fs::read_to_string(path).with_context(|| format!("failed to read station config: {path}"))?;
        let mut cfg: StationConfig = serde_json::from_str(&data).with_context(|| format!("invalid station config JSON in {path}"))?;
        cfg.normalize();
        Ok(cfg)
    }
}
