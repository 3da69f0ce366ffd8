//! Knell: a virtual-time discrete-event scheduling kernel with an
//! entity registry.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the Knell sub-crates. For most users, adding `knell` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use knell::prelude::*;
//! use std::any::Any;
//!
//! // A minimal entity that counts deliveries.
//! struct Bell { rings: u32 }
//! impl Entity for Bell {
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
//! let bell = kernel.registry().register(Box::new(Bell { rings: 0 }));
//! kernel.registry().rename(bell, Some("bell")).unwrap();
//!
//! // Schedule two strikes, out of order; they dispatch in due order.
//! kernel.post(bell, VirtualTime(20), |b: &mut dyn Entity, _: &mut Dispatch<'_>| {
//!     b.downcast_mut::<Bell>().unwrap().rings += 1;
//! }).unwrap();
//! kernel.post(bell, VirtualTime(10), |b: &mut dyn Entity, _: &mut Dispatch<'_>| {
//!     b.downcast_mut::<Bell>().unwrap().rings += 1;
//! }).unwrap();
//!
//! let result = kernel.advance_to(VirtualTime(30));
//! assert_eq!(result.dispatched, 2);
//! assert_eq!(kernel.now(), VirtualTime(30));
//!
//! // The bell is also reachable by name path.
//! assert_eq!(kernel.registry().find_by_path("/bell"), Some(bell));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `knell-core` | Ids, virtual time, errors, the `Entity` trait |
//! | [`registry`] | `knell-registry` | Entity arena, name paths, loans |
//! | [`sched`] | `knell-sched` | Kernel, event queue, payloads, metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, errors, and the `Entity` trait (`knell-core`).
pub use knell_core as types;

/// Entity registry: arena, dictionaries, name paths (`knell-registry`).
pub use knell_registry as registry;

/// Event queue and virtual-time kernel (`knell-sched`).
pub use knell_sched as sched;

/// Common imports for typical Knell usage.
///
/// ```rust
/// use knell::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use knell_core::{
        ConfigError, Entity, EntityId, PostError, RegistryError, SequenceId, Ticks, VirtualTime,
    };

    // Registry
    pub use knell_registry::{Group, Name, NameCase, Registry, RegistryConfig};

    // Kernel
    pub use knell_sched::{
        AdvanceResult, Dispatch, EventPayload, Kernel, KernelConfig, KernelMetrics, Poster,
    };
}
