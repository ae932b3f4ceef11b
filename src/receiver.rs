//! Receive-side pipeline: filter, validate, dispatch, per-class decode (§4.5).
//!
//! Owns its own `std::sync::Mutex`-protected state, independent of the
//! scheduler context's mutex (§5: "The receiver has its own mutex for
//! receiver statistics... it never acquires the scheduler mutex"), matching
//! the teacher's own use of a plain `std::sync::Mutex` for global state that
//! isn't reached from async task code (`time_driver`'s `CLOCK`/`SCHED`
//! statics).

use std::sync::Mutex;

use crate::codec::{self, ClassLayout, Direction, ParsedFrame};
use crate::error::CodecError;
use crate::types::{ClassId, DataType, NUM_CLASSES};

/// A decoded per-class element run, handed to a per-class decoder (§4.5).
pub struct ClassRun<'a> {
    pub class_id: ClassId,
    pub data_type: DataType,
    pub count: u32,
    pub bytes: &'a [u8],
}

/// Per-class decoder callback invoked once per class, in ordinal order.
pub type ClassDecoder<'a> = dyn FnMut(ClassRun<'_>) + 'a;

/// Cumulative receiver-side counters (§6).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverCounters {
    pub packets_received: u64,
    pub data_packets: u64,
    pub error_packets: u64,
}

/// Receiver statistics plus the last-observed per-class layout, guarded by a
/// mutex independent of [`crate::context::SchedulerContext`].
#[derive(Debug, Default)]
pub struct ReceiverState {
    pub counters: ReceiverCounters,
    pub last_observed_layout: Option<ClassLayout>,
}

/// Maximum plausible latency before it's treated as a clock/restart anomaly
/// and reported as zero instead (§4.5: "unreasonably large (> 30 s)").
const MAX_PLAUSIBLE_LATENCY_MS: u64 = 30_000;

/// A successfully parsed, dispatched frame, with latency already sanitized.
pub struct ReceivedFrame {
    pub layout: ClassLayout,
    pub latency_ms: u64,
    pub payload: ParsedFrame,
}

/// Receiver pipeline bound to one station's own address and role.
pub struct ReceiverPipeline {
    pub role: Direction,
    pub own_address: codec::MacAddr,
    pub state: Mutex<ReceiverState>,
}

impl ReceiverPipeline {
    pub fn new(role: Direction, own_address: codec::MacAddr) -> Self {
        Self {
            role,
            own_address,
            state: Mutex::new(ReceiverState::default()),
        }
    }

    /// Run one frame through filter -> parse -> validate -> dispatch (§4.5).
    ///
    /// Invokes `decode` once per class in ordinal order with that class's
    /// byte run. Returns `Err` (and counts `error_packets`) on any codec
    /// failure; the frame is discarded either way (§7).
    pub fn on_receive(&self, raw: &[u8], now_ms: u64, mut decode: impl FnMut(ClassRun<'_>)) -> Result<ReceivedFrame, CodecError> {
        let result = self.handle(raw, now_ms, &mut decode);
        let mut state = self.state.lock().expect("receiver state mutex poisoned");
        match &result {
            Ok(received) => {
                state.counters.packets_received += 1;
                state.counters.data_packets += 1;
                state.last_observed_layout = Some(received.layout);
            }
            Err(_) => {
                state.counters.error_packets += 1;
            }
        }
        result
    }

    fn handle(&self, raw: &[u8], now_ms: u64, decode: &mut impl FnMut(ClassRun<'_>)) -> Result<ReceivedFrame, CodecError> {
        // Length and direction checks (§4.4 steps 1-2) run before the
        // destination check (step 3): a too-short frame must be reported as
        // `TooShort`, not misclassified as `NotForUs` just because it also
        // happens to be too short to read a destination out of.
        let parsed = codec::parse_frame(self.role, raw)?;
        if !codec::accepts_destination(raw, self.own_address) {
            return Err(CodecError::NotForUs);
        }

        let timestamp_ms = parsed.timestamp_ms as u64;
        let latency_ms = if timestamp_ms > now_ms || now_ms - timestamp_ms > MAX_PLAUSIBLE_LATENCY_MS {
            0
        } else {
            now_ms - timestamp_ms
        };

        let mut offset = 0usize;
        for class_id in ClassId::ALL {
            let count = parsed.layout.count[class_id.ordinal()];
            let data_type = parsed.layout.data_type[class_id.ordinal()];
            let run_len = (count as usize * data_type.width()).min(parsed.payload.len() - offset);
            let bytes = &parsed.payload[offset..offset + run_len];
            decode(ClassRun {
                class_id,
                data_type,
                count,
                bytes,
            });
            offset += run_len;
        }

        let layout = parsed.layout;
        Ok(ReceivedFrame { layout, latency_ms, payload: parsed })
    }
}

/// `NUM_CLASSES`-aware sanity check used by callers that want to assert a
/// frame decoded cleanly (no leftover bytes after the last class run).
pub fn payload_fully_consumed(layout: &ClassLayout, payload_len: usize) -> bool {
    let total: usize = (0..NUM_CLASSES).map(|i| layout.count[i] as usize * layout.data_type[i].width()).sum();
    total == payload_len
}
