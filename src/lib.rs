//! Deadline-aware multi-class packet batching scheduler for a constrained
//! wireless station.
//!
//! Application producers generate short arrays of typed samples belonging
//! to one of several traffic classes, each with its own period and relative
//! deadline. A [`batcher`] coalesces pending items across classes into a
//! single bounded transmission buffer and emits that buffer as one wire
//! frame ([`codec`]), aiming to meet per-item deadlines, maximize channel
//! utilization by batching, and preserve a fixed inter-class ordering in
//! every emitted frame. A [`txpower`] loop adjusts radio output to the
//! minimum level sufficient for the observed link quality.
//!
//! Radio bring-up, credential storage, and channel-state collection are
//! external collaborators, reached only through the [`radio::Radio`]
//! capability trait.

pub mod batcher;
pub mod clock;
pub mod codec;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod producer;
pub mod queue;
pub mod radio;
pub mod receiver;
pub mod txpower;
pub mod types;
