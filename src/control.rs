//! Control surface semantics (§6, §9 "Control surface module").
//!
//! `spec.md` excludes the *interactive configuration terminal* as a feature
//! (§1) but not the command semantics behind it. This module carries the
//! teacher's own split between a typed command enum
//! (`control::command::ControlCommand`) and a conversion/application
//! function, minus the teacher's HTTP transport to a remote hub — there is
//! no remote hub here, so only the typed command and its application to a
//! [`SchedulerContext`] survive.

use rand::Rng;

use crate::context::SchedulerContext;
use crate::error::ConfigError;
use crate::types::{ClassId, DataType};

/// Valid range for a class period/deadline set with `auto` (§6).
pub const MIN_PERIOD_MS: u64 = 100;
pub const MAX_PERIOD_MS: u64 = 60_000;

/// Valid range for `count class n` (§6).
pub const MIN_PACKET_COUNT: u32 = 1;
pub const MAX_PACKET_COUNT: u32 = 200;

/// Valid range for `threshold ms` (§6).
pub const MIN_THRESHOLD_MS: u64 = 0;
pub const MAX_THRESHOLD_MS: u64 = 10_000;

/// Either an explicit value or `auto` (sampled uniformly within range on apply).
#[derive(Debug, Clone, Copy)]
pub enum PeriodSetting {
    Auto,
    Millis(u64),
}

/// Typed form of the `spec.md` §6 command surface. Transport (interactive
/// terminal, remote API) is explicitly out of scope; only semantics live here.
#[derive(Debug, Clone, Copy)]
pub enum ControlCommand {
    /// `set class period deadline`.
    SetClassTiming {
        class_id: ClassId,
        period: PeriodSetting,
        deadline_ms: u64,
    },
    /// `type class datatype`.
    SetClassType { class_id: ClassId, data_type: DataType },
    /// `count class n`.
    SetClassCount { class_id: ClassId, count: u32 },
    /// `threshold ms`.
    SetThreshold { threshold_ms: u64 },
    /// `rpacket on|off [min_ms] [max_ms]`.
    SetRandomEnabled {
        enabled: bool,
        min_interval_ms: Option<u64>,
        max_interval_ms: Option<u64>,
    },
    /// `rtype datatype`.
    SetRandomType { data_type: DataType },
    /// `rsize n`.
    SetRandomSize { element_count: u32 },
    /// `rdeadline ms`.
    SetRandomDeadline { deadline_ms: u64 },
    /// `rburst on|off period interval`.
    SetRandomBurst {
        enabled: bool,
        period_ms: u64,
        interval_ms: u64,
    },
    /// `autotx on|off`.
    SetAutoTxEnabled { enabled: bool },
    /// `autotx_interval ms`.
    SetAutoTxInterval { interval_ms: u64 },
}

/// Apply a command to the scheduler context, clamping where §6 specifies
/// clamping, and rejecting (leaving prior config untouched) otherwise (§7
/// `InvalidConfig`).
///
/// Random-producer-specific commands (`rpacket`, `rtype`, `rsize`,
/// `rdeadline`, `rburst`) mutate [`SchedulerContext::random_producer`],
/// which the running random producer task re-reads every tick (see
/// [`crate::producer::RandomProducerState::tick`]) — so these take effect
/// on the live task immediately, the same as `set`/`type`/`count` do for
/// the periodic classes. `rtype`/`rsize`/`rdeadline` also mirror the value
/// onto `classes[Random]` so `status`-style reads of the per-class array
/// stay consistent with the random producer's own config. `autotx`/
/// `autotx_interval` mutate [`SchedulerContext::tx_power`], re-read every
/// poll by [`crate::txpower::tx_power_task`] the same way.
pub fn apply(ctx: &mut SchedulerContext, command: ControlCommand, rng: &mut impl Rng) -> Result<(), ConfigError> {
    match command {
        ControlCommand::SetClassTiming {
            class_id,
            period,
            deadline_ms,
        } => {
            let period_ms = match period {
                PeriodSetting::Auto => rng.gen_range(MIN_PERIOD_MS..=MAX_PERIOD_MS),
                PeriodSetting::Millis(ms) => ms.clamp(MIN_PERIOD_MS, MAX_PERIOD_MS),
            };
            let runtime = ctx.class_mut(class_id);
            runtime.config.period_ms = period_ms;
            runtime.config.relative_deadline_ms = deadline_ms.clamp(MIN_PERIOD_MS, MAX_PERIOD_MS);
            Ok(())
        }
        ControlCommand::SetClassType { class_id, data_type } => {
            ctx.class_mut(class_id).config.data_type = data_type;
            Ok(())
        }
        ControlCommand::SetClassCount { class_id, count } => {
            if count == 0 {
                return Err(ConfigError("count must be at least 1".to_string()));
            }
            ctx.class_mut(class_id).config.count_target = count.clamp(MIN_PACKET_COUNT, MAX_PACKET_COUNT);
            Ok(())
        }
        ControlCommand::SetThreshold { threshold_ms } => {
            ctx.threshold_ms = threshold_ms.clamp(MIN_THRESHOLD_MS, MAX_THRESHOLD_MS);
            Ok(())
        }
        ControlCommand::SetRandomEnabled {
            enabled,
            min_interval_ms,
            max_interval_ms,
        } => {
            ctx.random_producer.enabled = enabled;
            if let Some(min_ms) = min_interval_ms {
                ctx.random_producer.min_interval_ms = min_ms;
            }
            if let Some(max_ms) = max_interval_ms {
                ctx.random_producer.max_interval_ms = max_ms;
            }
            ctx.random_producer.normalize();
            Ok(())
        }
        ControlCommand::SetRandomType { data_type } => {
            ctx.random_producer.data_type = data_type;
            ctx.class_mut(ClassId::Random).config.data_type = data_type;
            Ok(())
        }
        ControlCommand::SetRandomSize { element_count } => {
            if element_count == 0 {
                return Err(ConfigError("rsize must be at least 1".to_string()));
            }
            let count = element_count.clamp(MIN_PACKET_COUNT, MAX_PACKET_COUNT);
            ctx.random_producer.element_count = count;
            ctx.class_mut(ClassId::Random).config.count_target = count;
            Ok(())
        }
        ControlCommand::SetRandomDeadline { deadline_ms } => {
            let deadline_ms = deadline_ms.clamp(MIN_PERIOD_MS, MAX_PERIOD_MS);
            ctx.random_producer.relative_deadline_ms = deadline_ms;
            ctx.class_mut(ClassId::Random).config.relative_deadline_ms = deadline_ms;
            Ok(())
        }
        ControlCommand::SetRandomBurst {
            enabled,
            period_ms,
            interval_ms,
        } => {
            ctx.random_producer.burst_enabled = enabled;
            ctx.random_producer.burst_period_ms = period_ms;
            ctx.random_producer.burst_interval_ms = interval_ms;
            Ok(())
        }
        ControlCommand::SetAutoTxEnabled { enabled } => {
            ctx.tx_power.enabled = enabled;
            Ok(())
        }
        ControlCommand::SetAutoTxInterval { interval_ms } => {
            ctx.tx_power.interval_ms = interval_ms.clamp(MIN_PERIOD_MS, MAX_PERIOD_MS);
            Ok(())
        }
    }
}

/// Parse one line of the documented command grammar (§6) into a
/// [`ControlCommand`]. Returns [`ConfigError`] on anything malformed; the
/// caller's prior configuration is left untouched.
pub fn parse(line: &str) -> Result<ControlCommand, ConfigError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["set", class, period, deadline] => {
            let class_id = parse_class(class)?;
            let period = if *period == "auto" {
                PeriodSetting::Auto
            } else {
                PeriodSetting::Millis(parse_u64(period)?)
            };
            let deadline_ms = parse_u64(deadline)?;
            Ok(ControlCommand::SetClassTiming {
                class_id,
                period,
                deadline_ms,
            })
        }
        ["type", class, data_type] => Ok(ControlCommand::SetClassType {
            class_id: parse_class(class)?,
            data_type: parse_data_type(data_type)?,
        }),
        ["count", class, n] => Ok(ControlCommand::SetClassCount {
            class_id: parse_class(class)?,
            count: parse_u32(n)?,
        }),
        ["threshold", ms] => Ok(ControlCommand::SetThreshold { threshold_ms: parse_u64(ms)? }),
        ["rpacket", "on"] => Ok(ControlCommand::SetRandomEnabled {
            enabled: true,
            min_interval_ms: None,
            max_interval_ms: None,
        }),
        ["rpacket", "off"] => Ok(ControlCommand::SetRandomEnabled {
            enabled: false,
            min_interval_ms: None,
            max_interval_ms: None,
        }),
        ["rpacket", "on", min_ms, max_ms] => Ok(ControlCommand::SetRandomEnabled {
            enabled: true,
            min_interval_ms: Some(parse_u64(min_ms)?),
            max_interval_ms: Some(parse_u64(max_ms)?),
        }),
        ["rtype", data_type] => Ok(ControlCommand::SetRandomType {
            data_type: parse_data_type(data_type)?,
        }),
        ["rsize", n] => Ok(ControlCommand::SetRandomSize { element_count: parse_u32(n)? }),
        ["rdeadline", ms] => Ok(ControlCommand::SetRandomDeadline { deadline_ms: parse_u64(ms)? }),
        ["rburst", "on", period_ms, interval_ms] => Ok(ControlCommand::SetRandomBurst {
            enabled: true,
            period_ms: parse_u64(period_ms)?,
            interval_ms: parse_u64(interval_ms)?,
        }),
        ["rburst", "off", period_ms, interval_ms] => Ok(ControlCommand::SetRandomBurst {
            enabled: false,
            period_ms: parse_u64(period_ms)?,
            interval_ms: parse_u64(interval_ms)?,
        }),
        ["autotx", "on"] => Ok(ControlCommand::SetAutoTxEnabled { enabled: true }),
        ["autotx", "off"] => Ok(ControlCommand::SetAutoTxEnabled { enabled: false }),
        ["autotx_interval", ms] => Ok(ControlCommand::SetAutoTxInterval { interval_ms: parse_u64(ms)? }),
        _ => Err(ConfigError(format!("unrecognized command: {line}"))),
    }
}

fn parse_class(token: &str) -> Result<ClassId, ConfigError> {
    match token {
        "a" | "A" => Ok(ClassId::ClassA),
        "b" | "B" => Ok(ClassId::ClassB),
        "c" | "C" => Ok(ClassId::ClassC),
        "random" | "r" => Ok(ClassId::Random),
        other => Err(ConfigError(format!("unknown class: {other}"))),
    }
}

fn parse_data_type(token: &str) -> Result<DataType, ConfigError> {
    match token {
        "i8" => Ok(DataType::Int8),
        "i16" => Ok(DataType::Int16),
        "i32" => Ok(DataType::Int32),
        "f32" => Ok(DataType::Float32),
        "f64" => Ok(DataType::Float64),
        other => Err(ConfigError(format!("unknown data type: {other}"))),
    }
}

fn parse_u64(token: &str) -> Result<u64, ConfigError> {
    token.parse().map_err(|_| ConfigError(format!("expected an integer, got {token}")))
}

fn parse_u32(token: &str) -> Result<u32, ConfigError> {
    token.parse().map_err(|_| ConfigError(format!("expected an integer, got {token}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StationConfig;

    #[test]
    fn set_threshold_clamps_to_range() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        apply(&mut ctx, ControlCommand::SetThreshold { threshold_ms: 999_999 }, &mut rng).unwrap();
        assert_eq!(ctx.threshold_ms, MAX_THRESHOLD_MS);
    }

    #[test]
    fn set_class_count_rejects_zero_and_preserves_prior_value() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        let before = ctx.class(ClassId::ClassA).config.count_target;
        let result = apply(&mut ctx, ControlCommand::SetClassCount { class_id: ClassId::ClassA, count: 0 }, &mut rng);
        assert!(result.is_err());
        assert_eq!(ctx.class(ClassId::ClassA).config.count_target, before);
    }

    #[test]
    fn set_class_count_clamps_above_max() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        apply(
            &mut ctx,
            ControlCommand::SetClassCount {
                class_id: ClassId::ClassB,
                count: MAX_PACKET_COUNT + 50,
            },
            &mut rng,
        )
        .unwrap();
        assert_eq!(ctx.class(ClassId::ClassB).config.count_target, MAX_PACKET_COUNT);
    }

    #[test]
    fn parse_recognizes_documented_grammar() {
        assert!(matches!(
            parse("set a 1000 2000").unwrap(),
            ControlCommand::SetClassTiming { class_id: ClassId::ClassA, .. }
        ));
        assert!(matches!(parse("type b f32").unwrap(), ControlCommand::SetClassType { class_id: ClassId::ClassB, .. }));
        assert!(matches!(parse("count c 20").unwrap(), ControlCommand::SetClassCount { class_id: ClassId::ClassC, .. }));
        assert!(matches!(parse("threshold 500").unwrap(), ControlCommand::SetThreshold { threshold_ms: 500 }));
        assert!(matches!(parse("rpacket off").unwrap(), ControlCommand::SetRandomEnabled { enabled: false, .. }));
        assert!(matches!(parse("rtype i16").unwrap(), ControlCommand::SetRandomType { data_type: DataType::Int16 }));
        assert!(matches!(parse("rsize 8").unwrap(), ControlCommand::SetRandomSize { element_count: 8 }));
        assert!(matches!(parse("rdeadline 250").unwrap(), ControlCommand::SetRandomDeadline { deadline_ms: 250 }));
        assert!(matches!(
            parse("rburst on 5000 50").unwrap(),
            ControlCommand::SetRandomBurst { enabled: true, period_ms: 5000, interval_ms: 50 }
        ));
    }

    #[test]
    fn parse_rejects_unknown_command() {
        assert!(parse("frobnicate now").is_err());
    }

    #[test]
    fn parse_rejects_unknown_class() {
        assert!(parse("set z 1000 2000").is_err());
    }

    #[test]
    fn rdeadline_updates_both_random_producer_config_and_class_runtime() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        apply(&mut ctx, ControlCommand::SetRandomDeadline { deadline_ms: 250 }, &mut rng).unwrap();
        assert_eq!(ctx.random_producer.relative_deadline_ms, 250);
        assert_eq!(ctx.class(ClassId::Random).config.relative_deadline_ms, 250);
    }

    #[test]
    fn rburst_updates_live_random_producer_config() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        apply(
            &mut ctx,
            ControlCommand::SetRandomBurst {
                enabled: false,
                period_ms: 9000,
                interval_ms: 25,
            },
            &mut rng,
        )
        .unwrap();
        assert!(!ctx.random_producer.burst_enabled);
        assert_eq!(ctx.random_producer.burst_period_ms, 9000);
        assert_eq!(ctx.random_producer.burst_interval_ms, 25);
    }

    #[test]
    fn autotx_off_then_autotx_interval_mutate_live_tx_power_config() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        apply(&mut ctx, ControlCommand::SetAutoTxEnabled { enabled: false }, &mut rng).unwrap();
        assert!(!ctx.tx_power.enabled);
        apply(&mut ctx, ControlCommand::SetAutoTxInterval { interval_ms: 2_500 }, &mut rng).unwrap();
        assert_eq!(ctx.tx_power.interval_ms, 2_500);
    }

    #[test]
    fn autotx_interval_clamps_to_period_range() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        apply(&mut ctx, ControlCommand::SetAutoTxInterval { interval_ms: 999_999 }, &mut rng).unwrap();
        assert_eq!(ctx.tx_power.interval_ms, MAX_PERIOD_MS);
    }

    #[test]
    fn parse_recognizes_autotx_commands() {
        assert!(matches!(parse("autotx on").unwrap(), ControlCommand::SetAutoTxEnabled { enabled: true }));
        assert!(matches!(parse("autotx off").unwrap(), ControlCommand::SetAutoTxEnabled { enabled: false }));
        assert!(matches!(
            parse("autotx_interval 2500").unwrap(),
            ControlCommand::SetAutoTxInterval { interval_ms: 2500 }
        ));
    }

    #[test]
    fn rpacket_on_with_interval_normalizes_inverted_range() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let mut rng = rand::thread_rng();
        apply(
            &mut ctx,
            ControlCommand::SetRandomEnabled {
                enabled: true,
                min_interval_ms: Some(2000),
                max_interval_ms: Some(1000),
            },
            &mut rng,
        )
        .unwrap();
        assert_eq!(ctx.random_producer.max_interval_ms, 3000);
    }
}
