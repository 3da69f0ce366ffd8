//! Error types for the Knell scheduling kernel, organized by subsystem:
//! configuration, registry, and event posting.
//!
//! Soft failures (lookup misses, lost cancellation races, queries on
//! fired events) are `Option`/`bool` results on the APIs themselves and
//! never appear here. These enums cover the caller-must-check cases;
//! fatal invariant violations (time travel, duplicate id registration)
//! panic at the call site instead.

use std::error::Error;
use std::fmt;

use crate::id::EntityId;

/// Errors from kernel and registry configuration validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The root container id falls inside the dynamic allocation range.
    RootInDynamicRange {
        /// The configured root id.
        root: EntityId,
        /// The first id the dynamic allocator may hand out.
        first_dynamic: EntityId,
    },
    /// The dynamic watermark is zero, leaving no well-known id pool.
    ZeroDynamicWatermark,
    /// The configured root container name is not a legal entity name.
    InvalidRootName,
    /// The first sequence number is zero; the counter starts at 1.
    ZeroFirstSequence,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootInDynamicRange {
                root,
                first_dynamic,
            } => write!(
                f,
                "root id {root} is not below the dynamic watermark {first_dynamic}"
            ),
            Self::ZeroDynamicWatermark => {
                write!(f, "first_dynamic_id must be at least 1")
            }
            Self::InvalidRootName => write!(f, "root container name is not a legal name"),
            Self::ZeroFirstSequence => write!(f, "first_sequence must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

/// Errors from registry mutation operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The operation targeted an id that is not live.
    UnknownEntity(EntityId),
    /// The proposed name is not a legal entity name.
    InvalidName(String),
    /// A direct sibling under the same container already holds the name.
    /// The entity keeps its previous name.
    NameTaken {
        /// The container whose children clashed.
        parent: EntityId,
        /// The contested name.
        name: String,
    },
    /// Reparenting would make an entity its own ancestor.
    WouldCycle {
        /// The entity being moved.
        entity: EntityId,
        /// The proposed parent, which is a descendant of `entity`.
        parent: EntityId,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEntity(id) => write!(f, "entity {id} is not registered"),
            Self::InvalidName(name) => write!(f, "invalid entity name '{name}'"),
            Self::NameTaken { parent, name } => {
                write!(f, "container {parent} already has a child named '{name}'")
            }
            Self::WouldCycle { entity, parent } => {
                write!(f, "moving entity {entity} under {parent} would form a cycle")
            }
        }
    }
}

impl Error for RegistryError {}

/// Errors from posting an event.
///
/// Posting performs a best-effort liveness check so a record that can
/// never dispatch is rejected immediately; dispatch re-checks, because
/// the target can still die between post and due time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostError {
    /// The target id did not resolve in the registry at post time.
    UnknownTarget(EntityId),
}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTarget(id) => {
                write!(f, "post target {id} does not resolve to a live entity")
            }
        }
    }
}

impl Error for PostError {}
