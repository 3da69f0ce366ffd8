//! Entity registry for the Knell scheduling kernel.
//!
//! Owns every simulation entity in a slot arena, maps process-unique
//! integer ids and hierarchical name paths to live entities, and hands
//! out exclusive RAII loans for entity access. Pending events and every
//! other subsystem hold only the integer id, so a destroyed entity
//! fails resolution instead of dangling.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod name;
pub mod path;
pub mod registry;

pub use config::RegistryConfig;
pub use name::{is_valid_name, Name, NameCase};
pub use registry::{EntityLoan, Group, Registry};
