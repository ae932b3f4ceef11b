//! Scheduler context: the mutex-protected singleton (§3 "Scheduler context",
//! §4.2, §5, §9 "Singleton scheduler context").
//!
//! `spec.md` §9 recommends, for a systems-language rewrite, passing a
//! reference to a context structure into each task rather than a true
//! global. This crate follows that: `SchedulerContext` is constructed once
//! by the demo binary and shared behind
//! `embassy_sync::mutex::Mutex<CriticalSectionRawMutex, SchedulerContext>`
//! referenced through `'static` storage, the same `Box::leak` pattern the
//! teacher uses to give its per-node Embassy channels `'static` lifetimes
//! (see `simulation::node_task::NodeContext::initialize`, "INTENTIONAL
//! LEAK"). There is exactly one scheduler mutex; lock ordering is
//! structurally trivial (§5).

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use crate::config::{ClassConfig, RandomProducerConfig, StationConfig, TxPowerConfig};
use crate::queue::BoundedQueue;
use crate::types::{ClassId, NUM_CLASSES, QueuedPacket};

/// Per-class runtime state: configuration, queue, and periodic-producer bookkeeping.
#[derive(Debug)]
pub struct ClassRuntime {
    pub config: ClassConfig,
    pub queue: BoundedQueue,
    /// Last time (ms) the periodic producer fired this class; `None` before
    /// the first fire (§4.2: `last_fired[c]`).
    pub last_fired_ms: Option<u64>,
}

impl ClassRuntime {
    fn new(config: ClassConfig) -> Self {
        Self {
            config,
            queue: BoundedQueue::new(),
            last_fired_ms: None,
        }
    }
}

/// Cumulative, externally-observable counters (§6 "Counters (read-only)").
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub packets_processed: u64,
    pub packets_transmitted: u64,
    pub deadline_misses: u64,
}

/// Process-wide mutable scheduler state, guarded by a single mutex (§5).
///
/// Mutated by producers (`enqueue`), the batcher (peek/dequeue/re-enqueue +
/// counters), and the control surface (class settings). Never holds a lock
/// across radio transmission or TX-buffer allocation — enforced by
/// convention: [`crate::batcher::tick`] is a plain synchronous function
/// called while the lock is held, and the caller releases the lock before
/// awaiting `Radio::send`.
#[derive(Debug)]
pub struct SchedulerContext {
    /// Indexed by [`ClassId::ordinal`]; `classes[3]` is the random class,
    /// whose `config.period_ms` is unused (its cadence comes from
    /// `RandomProducerConfig` instead, §4.2).
    pub classes: [ClassRuntime; NUM_CLASSES],
    pub threshold_ms: u64,
    pub counters: Counters,
    /// Random (aperiodic) producer parameters, read fresh by
    /// [`crate::producer::RandomProducerState::tick`] on every tick rather
    /// than copied into the task's local state, the same way
    /// [`crate::producer::periodic_tick`] re-reads `classes[..].config`
    /// every call. This is what makes `rpacket`/`rtype`/`rsize`/`rdeadline`/
    /// `rburst` (§6) live: the control surface only ever mutates this
    /// context, never a producer-task-local copy.
    pub random_producer: RandomProducerConfig,
    /// TX-power controller thresholds and enable/interval knobs, read fresh by
    /// [`crate::txpower::tx_power_task`] each poll the same way
    /// `random_producer` is read fresh by the random producer task — this is
    /// what makes `autotx`/`autotx_interval` (§6) live instead of frozen at
    /// task-spawn time.
    pub tx_power: TxPowerConfig,
}

impl SchedulerContext {
    /// Construct a fresh context from a loaded [`StationConfig`] (§4.2 "Scheduler init").
    pub fn new(config: &StationConfig) -> Self {
        let random_class_config = ClassConfig {
            data_type: config.random.data_type,
            period_ms: 0,
            relative_deadline_ms: config.random.relative_deadline_ms,
            count_target: config.random.element_count,
        };
        Self {
            classes: [
                ClassRuntime::new(config.class(ClassId::ClassA)),
                ClassRuntime::new(config.class(ClassId::ClassB)),
                ClassRuntime::new(config.class(ClassId::ClassC)),
                ClassRuntime::new(random_class_config),
            ],
            threshold_ms: config.threshold_ms,
            counters: Counters::default(),
            random_producer: config.random,
            tx_power: config.tx_power,
        }
    }

    pub fn class(&self, class_id: ClassId) -> &ClassRuntime {
        &self.classes[class_id.ordinal()]
    }

    pub fn class_mut(&mut self, class_id: ClassId) -> &mut ClassRuntime {
        &mut self.classes[class_id.ordinal()]
    }

    /// Enqueue a producer-synthesized packet onto its class's queue (§4.2).
    /// Overflow is the producer's problem to log and drop; this just reports it.
    pub fn enqueue(&mut self, packet: QueuedPacket) -> Result<(), crate::error::QueueError> {
        self.class_mut(packet.class_id).queue.enqueue_back(packet)
    }

    /// Current length of each class's queue, in ordinal order (§6 counters).
    pub fn queue_lengths(&self) -> [usize; NUM_CLASSES] {
        let mut lengths = [0usize; NUM_CLASSES];
        for (i, class) in self.classes.iter().enumerate() {
            lengths[i] = class.queue.len();
        }
        lengths
    }
}

/// Shared, `'static` handle to a [`SchedulerContext`], the shape every task
/// (producer, batcher, control surface) is handed.
pub type SharedContext = &'static Mutex<CriticalSectionRawMutex, SchedulerContext>;

/// Leak a freshly constructed context to get a `'static` shared handle,
/// mirroring the teacher's `Box::leak`-for-process-lifetime convention.
pub fn leak_context(config: &StationConfig) -> SharedContext {
    Box::leak(Box::new(Mutex::new(SchedulerContext::new(config))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn new_context_seeds_random_class_from_random_producer_config() {
        let cfg = StationConfig::default();
        let ctx = SchedulerContext::new(&cfg);
        let random = ctx.class(ClassId::Random);
        assert_eq!(random.config.data_type as u8, cfg.random.data_type as u8);
        assert_eq!(random.config.count_target, cfg.random.element_count);
        assert_eq!(random.config.period_ms, 0);
    }

    #[test]
    fn enqueue_routes_to_the_packets_class_queue() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        let packet = QueuedPacket::new(ClassId::ClassB, DataType::Float32, 2, 1000, vec![0u8; 8]).unwrap();
        ctx.enqueue(packet).unwrap();
        assert_eq!(ctx.class(ClassId::ClassB).queue.len(), 1);
        assert_eq!(ctx.class(ClassId::ClassA).queue.len(), 0);
    }

    #[test]
    fn queue_lengths_reports_per_class_in_ordinal_order() {
        let cfg = StationConfig::default();
        let mut ctx = SchedulerContext::new(&cfg);
        ctx.enqueue(QueuedPacket::new(ClassId::ClassC, DataType::Int16, 1, 10, vec![0u8; 2]).unwrap()).unwrap();
        assert_eq!(ctx.queue_lengths(), [0, 0, 1, 0]);
    }
}
