//! Virtual-time event queue and kernel for Knell.
//!
//! Provides the [`Kernel`]: a discrete-event scheduler over an entity
//! registry. Events are totally ordered by `(due time, sequence
//! number)`, giving deterministic, replayable dispatch; posting is
//! thread-safe through [`Poster`] while time itself is driven by
//! exactly one owner.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod kernel;
pub mod metrics;
pub mod payload;
pub mod record;

mod queue;

pub use config::KernelConfig;
pub use kernel::{AdvanceResult, Dispatch, Kernel, Poster};
pub use metrics::KernelMetrics;
pub use payload::EventPayload;
pub use record::EventRecord;
