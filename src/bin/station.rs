//! Demo station binary: wires the scheduler tasks together against a small
//! in-process radio stand-in and runs them on an Embassy executor, the way
//! the teacher's `main.rs` wires `network_task` onto its own executor
//! thread (minus the UI channels this crate has no use for).
//!
//! Usage: `station [config.json]`. Without an argument, built-in defaults
//! (`StationConfig::default()`) are used.

use std::env;
use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::Arc;

use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use log::{error, info, warn, LevelFilter};
use rand::thread_rng;
use rand_distr::{Distribution, Normal};

use txsched::clock::MonotonicClock;
use txsched::codec::{Direction, Endpoint, MacAddr};
use txsched::config::StationConfig;
use txsched::context::{self, SharedContext};
use txsched::error::RadioError;
use txsched::radio::Radio;
use txsched::receiver::ReceiverPipeline;
use txsched::txpower::PowerLevel;
use txsched::{batcher, producer, txpower};

const STATION_ADDRESS: MacAddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
const AP_ADDRESS: MacAddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0xaa];

/// Capacity of the loopback channel standing in for the air interface: the
/// batcher's emitted frames are handed to this channel instead of real
/// hardware, and a receiver task drains it, demonstrating the full
/// build -> transmit -> parse -> decode path without a radio.
const AIR_CHANNEL_SIZE: usize = 16;
type AirChannel = Channel<CriticalSectionRawMutex, Vec<u8>, AIR_CHANNEL_SIZE>;

/// A `Radio` that logs every transmitted frame, loops it back onto the air
/// channel for the receiver task, and simulates RSSI as a small random walk
/// around a fixed center — there being no physical radio to bring up
/// (spec §1 non-goal).
struct LoggingRadio {
    air_tx: &'static AirChannel,
    rssi_center: i8,
    rssi: Arc<AtomicI8>,
}

impl Radio for LoggingRadio {
    fn send(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        info!("tx: {} bytes", frame.len());
        if self.air_tx.try_send(frame.to_vec()).is_err() {
            warn!("air channel full, frame dropped before reaching receiver");
        }
        Ok(())
    }

    fn query_rssi(&mut self) -> Option<i8> {
        // Log-normal shadowing jitter around the current reading, the same
        // Normal-distribution noise model the teacher samples for simulated
        // RSSI (signal_calculations::calculate_path_loss), standing in for a
        // real radio's fluctuating link quality reading.
        let shadowing = Normal::new(0.0f32, 4.0).expect("fixed sigma is always valid");
        let step = shadowing.sample(&mut thread_rng()).round() as i8;
        let next = self.rssi.load(Ordering::Relaxed).saturating_add(step).clamp(self.rssi_center - 40, self.rssi_center + 10);
        self.rssi.store(next, Ordering::Relaxed);
        Some(next)
    }

    fn set_power(&mut self, level: PowerLevel) -> Result<(), RadioError> {
        info!("tx power -> {level:?}");
        Ok(())
    }
}

#[embassy_executor::task]
async fn run_batcher(ctx: SharedContext, air_tx: &'static AirChannel) {
    let radio = LoggingRadio {
        air_tx,
        rssi_center: -40,
        rssi: Arc::new(AtomicI8::new(-40)),
    };
    let endpoint = Endpoint {
        direction: Direction::StationToAp,
        own_address: STATION_ADDRESS,
        bssid: AP_ADDRESS,
    };
    batcher::batcher_task(ctx, MonotonicClock, radio, endpoint, AP_ADDRESS).await;
}

#[embassy_executor::task]
async fn run_periodic_producer(ctx: SharedContext) {
    producer::periodic_producer_task(ctx, MonotonicClock).await;
}

#[embassy_executor::task]
async fn run_random_producer(ctx: SharedContext) {
    producer::random_producer_task(ctx, MonotonicClock).await;
}

#[embassy_executor::task]
async fn run_tx_power(ctx: SharedContext, air_tx: &'static AirChannel) {
    let radio = LoggingRadio {
        air_tx,
        rssi_center: -40,
        rssi: Arc::new(AtomicI8::new(-40)),
    };
    txpower::tx_power_task(radio, ctx).await;
}

/// Drains the loopback air channel, running every frame through the
/// receiver pipeline (§4.5) and logging the decoded per-class runs.
#[embassy_executor::task]
async fn run_receiver(air_rx: &'static AirChannel, clock: MonotonicClock) {
    use txsched::clock::Clock;
    let pipeline = ReceiverPipeline::new(Direction::ApToStation, AP_ADDRESS);
    loop {
        let frame = air_rx.receive().await;
        let now_ms = clock.now_ms();
        let result = pipeline.on_receive(&frame, now_ms, |run| {
            if run.count > 0 {
                info!("rx class {:?}: {} x {:?}", run.class_id, run.count, run.data_type);
            }
        });
        if let Err(err) = result {
            warn!("dropped frame: {err}");
        }
    }
}

/// Periodically logs cumulative counters (§6 "Counters (read-only)").
#[embassy_executor::task]
async fn run_status_log(ctx: SharedContext) {
    loop {
        Timer::after(Duration::from_secs(5)).await;
        let guard = ctx.lock().await;
        info!(
            "processed={} transmitted={} deadline_misses={} queue_lengths={:?}",
            guard.counters.packets_processed,
            guard.counters.packets_transmitted,
            guard.counters.deadline_misses,
            guard.queue_lengths(),
        );
    }
}

fn load_config() -> StationConfig {
    match env::args().nth(1) {
        Some(path) => match StationConfig::load_from_path(&path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!("{err:#}; falling back to defaults");
                StationConfig::default()
            }
        },
        None => StationConfig::default(),
    }
}

fn embassy_init(spawner: Spawner) {
    let cfg = load_config();
    let ctx: SharedContext = context::leak_context(&cfg);
    let air_channel: &'static AirChannel = Box::leak(Box::new(Channel::new()));

    spawner.spawn(run_periodic_producer(ctx)).expect("spawn periodic producer");
    spawner.spawn(run_random_producer(ctx)).expect("spawn random producer");
    spawner.spawn(run_batcher(ctx, air_channel)).expect("spawn batcher");
    spawner.spawn(run_tx_power(ctx, air_channel)).expect("spawn tx power controller");
    spawner.spawn(run_receiver(air_channel, MonotonicClock)).expect("spawn receiver");
    spawner.spawn(run_status_log(ctx)).expect("spawn status log");
}

fn main() {
    env_logger::Builder::new().filter_level(LevelFilter::Info).filter(Some("txsched"), LevelFilter::Debug).init();
    info!("starting station");

    let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
    executor.run(|spawner| embassy_init(spawner));
}
