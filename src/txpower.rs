//! Adaptive TX-power control loop (§4.6, §9 "Adaptive TX-power feedback").
//!
//! Expressed exactly as the design notes suggest: a pure `Level × RSSI ->
//! Level'` state machine (`map_rssi_to_power`) with no shared mutable state
//! with the batcher, wrapped by a periodic task that only writes to the
//! radio when the mapped bin actually changes.

use embassy_time::{Duration, Timer};

use crate::config::TxPowerConfig;
use crate::context::SharedContext;
use crate::radio::Radio;

/// Discrete radio transmit power levels, coarsest-grained at `Min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerLevel {
    Min,
    Low,
    Medium,
    High,
}

/// Map an observed RSSI (dBm) to a power level using the fixed thresholds in
/// `cfg` (§4.6 step 3). Comparisons are `>=`, so small fluctuations at a bin
/// boundary settle on the lower-power side — by construction, never on the
/// lower-threshold side, avoiding oscillation within a bin (§4.6 "Stability").
pub fn map_rssi_to_power(rssi: i8, cfg: &TxPowerConfig) -> PowerLevel {
    if rssi >= cfg.rssi_excellent {
        PowerLevel::Min
    } else if rssi >= cfg.rssi_good {
        PowerLevel::Low
    } else if rssi >= cfg.rssi_fair {
        PowerLevel::Medium
    } else {
        PowerLevel::High
    }
}

/// Independent periodic task: poll RSSI, map to a level, apply only on
/// change (§4.6). Holds no lock shared with the scheduler context across a
/// radio call — the config is read fresh out of `ctx.tx_power` at the top of
/// each iteration (mirroring [`crate::producer::random_producer_task`]'s
/// re-read of `ctx.random_producer`), then the lock is dropped before
/// `radio.query_rssi`/`set_power`, so `autotx`/`autotx_interval` (§6) take
/// effect on the already-running task rather than only at spawn time.
pub async fn tx_power_task(mut radio: impl Radio, ctx: SharedContext) {
    let mut current_level: Option<PowerLevel> = None;
    loop {
        let cfg: TxPowerConfig = ctx.lock().await.tx_power;

        if !cfg.enabled {
            Timer::after(Duration::from_millis(cfg.interval_ms)).await;
            continue;
        }
        match radio.query_rssi() {
            Some(rssi) => {
                let mapped = map_rssi_to_power(rssi, &cfg);
                if current_level != Some(mapped) {
                    match radio.set_power(mapped) {
                        Ok(()) => current_level = Some(mapped),
                        Err(err) => log::error!("failed to apply tx power level: {err}"),
                    }
                }
            }
            None => log::warn!("rssi unavailable this tick, skipping tx power update"),
        }
        Timer::after(Duration::from_millis(cfg.interval_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> TxPowerConfig {
        TxPowerConfig {
            enabled: true,
            interval_ms: 5000,
            rssi_excellent: -20,
            rssi_good: -30,
            rssi_fair: -50,
        }
    }

    #[test]
    fn maps_thresholds_to_expected_bins() {
        let cfg = cfg();
        assert_eq!(map_rssi_to_power(-10, &cfg), PowerLevel::Min);
        assert_eq!(map_rssi_to_power(-20, &cfg), PowerLevel::Min);
        assert_eq!(map_rssi_to_power(-25, &cfg), PowerLevel::Low);
        assert_eq!(map_rssi_to_power(-30, &cfg), PowerLevel::Low);
        assert_eq!(map_rssi_to_power(-40, &cfg), PowerLevel::Medium);
        assert_eq!(map_rssi_to_power(-50, &cfg), PowerLevel::Medium);
        assert_eq!(map_rssi_to_power(-80, &cfg), PowerLevel::High);
    }

    #[test]
    fn s6_scenario_power_transitions_follow_mock_rssi_sequence() {
        // §8 S6: [-10, -22, -40, -80, -22] maps to MIN, MIN, LOW, HIGH, LOW.
        // -22 appears twice but only transitions (no redundant writes) matter
        // here; the task-level "no write when unchanged" behavior is covered
        // by the scenario test in tests/scenarios.rs against a MockRadio.
        let cfg = cfg();
        let sequence = [-10i8, -22, -40, -80, -22];
        let levels: Vec<PowerLevel> = sequence.iter().map(|rssi| map_rssi_to_power(*rssi, &cfg)).collect();
        assert_eq!(
            levels,
            vec![PowerLevel::Min, PowerLevel::Min, PowerLevel::Low, PowerLevel::High, PowerLevel::Low]
        );
    }
}
