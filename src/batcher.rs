//! Deadline-triggered batching scheduler (§4.3).
//!
//! `tick` is deliberately a plain, synchronous, unit-testable function with
//! no I/O: it takes the context (already locked by the caller), decides
//! whether to emit, packs a buffer, and returns. The async task wrapping it
//! acquires the mutex, calls `tick`, releases the mutex, and only then
//! awaits `Radio::send` — the concurrency discipline §5 requires ("releases
//! the mutex before radio transmission... and before any memory allocation
//! of the TX buffer" is satisfied trivially here since the buffer is built
//! inside the locked region and handed out by value).

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};

use crate::clock::Clock;
use crate::codec::{self, ClassLayout, Endpoint, MacAddr};
use crate::context::SchedulerContext;
use crate::radio::Radio;
use crate::types::{ClassId, MAX_TX_SIZE, NUM_CLASSES};

/// Batcher task period (§4.3).
pub const SCHEDULER_CHECK_INTERVAL_MS: u64 = 50;

/// Below this many remaining bytes, stop adding from the current class and
/// all following classes in this pass (§4.3 step 2).
const LOW_WATER_MARK: usize = 100;

/// A packed frame ready to hand to the radio, plus the bookkeeping needed to
/// count "one transmission per non-zero class column" (§4.3 step 3, §9 Open
/// Question: `packets_transmitted` counts class columns, not source packets).
pub struct PackedFrame {
    pub layout: ClassLayout,
    pub payload: Vec<u8>,
    pub timestamp_ms: u64,
    pub transmissions: u64,
}

/// Run one batcher tick against `ctx` at time `now_ms` (§4.3 steps 1-3).
/// Returns `None` when nothing is due or nothing fits into a non-empty frame.
pub fn tick(ctx: &mut SchedulerContext, now_ms: u64) -> Option<PackedFrame> {
    // Step 1: select trigger.
    let min_deadline = ClassId::ALL
        .iter()
        .filter_map(|c| ctx.class(*c).queue.peek_front().ok().map(|p| p.deadline_ms))
        .min();
    let min_deadline = min_deadline?;
    if min_deadline > now_ms + ctx.threshold_ms {
        return None;
    }

    // Step 2: pack.
    let mut payload = Vec::with_capacity(MAX_TX_SIZE);
    let mut remaining = MAX_TX_SIZE;
    let mut count_out = [0u32; NUM_CLASSES];
    let mut data_type_out = [crate::types::DataType::Int8; NUM_CLASSES];
    for class_id in ClassId::ALL {
        data_type_out[class_id.ordinal()] = ctx.class(class_id).config.data_type;
    }

    for class_id in ClassId::ALL {
        if remaining < LOW_WATER_MARK {
            // Stop adding from this class and all following ones this pass.
            break;
        }
        loop {
            let fits = match ctx.class(class_id).queue.peek_front() {
                Ok(head) => head.size <= remaining,
                Err(_) => break, // queue empty
            };
            if !fits {
                // Head doesn't fit; leave it in place for the next pass.
                break;
            }
            let packet = ctx.class_mut(class_id).queue.dequeue_front().expect("peeked Ok above");
            if now_ms > packet.deadline_ms {
                ctx.counters.deadline_misses += 1;
                ctx.counters.packets_processed += 1;
                continue; // drop; examine the new head next loop iteration
            }
            payload.extend_from_slice(&packet.payload);
            remaining -= packet.size;
            count_out[class_id.ordinal()] += packet.data_count;
            ctx.counters.packets_processed += 1;

            if remaining < LOW_WATER_MARK {
                break;
            }
        }
    }

    // Step 3: emit.
    if payload.is_empty() {
        return None;
    }
    let transmissions = count_out.iter().filter(|c| **c > 0).count() as u64;
    ctx.counters.packets_transmitted += transmissions;

    Some(PackedFrame {
        layout: ClassLayout {
            count: count_out,
            data_type: data_type_out,
        },
        payload,
        timestamp_ms: now_ms,
        transmissions,
    })
}

/// Async batcher task: ticks every [`SCHEDULER_CHECK_INTERVAL_MS`], calling
/// `tick` under the context lock, then building and transmitting the frame
/// with the lock released (§5).
pub async fn batcher_task(
    ctx: &'static Mutex<CriticalSectionRawMutex, SchedulerContext>,
    clock: impl Clock,
    mut radio: impl Radio,
    endpoint: Endpoint,
    peer: MacAddr,
) {
    loop {
        let now_ms = clock.now_ms();
        let packed = {
            let mut guard = ctx.lock().await;
            tick(&mut guard, now_ms)
        };

        if let Some(packed) = packed {
            let frame = codec::build_frame(&endpoint, peer, &packed.layout, &packed.payload, packed.timestamp_ms as u32);
            if let Err(err) = radio.send(&frame) {
                log::error!("transmit failed, frame lost: {err}");
            }
        }

        Timer::after(Duration::from_millis(SCHEDULER_CHECK_INTERVAL_MS)).await;
    }
}
