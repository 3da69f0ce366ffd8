//! The entity registry: slot arena, id dictionary, and entity tree.
//!
//! The registry owns every entity (strong ownership in the slot arena);
//! everything else in the system addresses entities by [`EntityId`], a
//! weak handle that fails resolution once the entity is gone. Entities
//! form a tree used purely for name-path lookup; the scheduler never
//! consults it.
//!
//! # Locking
//!
//! A single internal mutex guards the dictionaries, held only for the
//! duration of each dictionary mutation. User code (lifecycle hooks and
//! event payloads) always runs with the lock released: entity access
//! goes through an exclusive [`EntityLoan`] that takes the boxed entity
//! out of its slot and restores it on drop. A payload may therefore call
//! back into the registry freely during its own dispatch.

use std::any::Any;
use std::sync::Mutex;

use indexmap::IndexMap;
use smallvec::SmallVec;

use knell_core::{ConfigError, Entity, EntityId, RegistryError};

use crate::config::RegistryConfig;
use crate::name::{is_valid_name, Name, NameCase};

/// A no-behavior container entity.
///
/// Used for the root container and anywhere a pure grouping node is
/// needed in the name tree.
pub struct Group;

impl Entity for Group {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Where a slot's entity currently is.
enum SlotState {
    /// The entity is at rest in the arena.
    Occupied(Box<dyn Entity>),
    /// The entity is loaned out (its dispatch or a hook is running).
    Loaned,
    /// The entity was removed while loaned; the loan drops it on return.
    Condemned,
}

struct Slot {
    state: SlotState,
    name: Option<Name>,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

impl Slot {
    fn is_live(&self) -> bool {
        matches!(self.state, SlotState::Occupied(_) | SlotState::Loaned)
    }
}

pub(crate) struct RegistryInner {
    config: RegistryConfig,
    next_dynamic: u64,
    slots: IndexMap<EntityId, Slot>,
}

impl RegistryInner {
    pub(crate) fn root(&self) -> EntityId {
        self.config.root_id
    }

    pub(crate) fn is_live(&self, id: EntityId) -> bool {
        self.slots.get(&id).is_some_and(Slot::is_live)
    }

    /// First direct child of `parent` whose name matches, in insertion
    /// order. Loaned children are still resolvable.
    pub(crate) fn child_by_name(
        &self,
        parent: EntityId,
        name: &str,
        case: NameCase,
    ) -> Option<EntityId> {
        let slot = self.slots.get(&parent)?;
        for &child in &slot.children {
            let matched = self
                .slots
                .get(&child)
                .and_then(|c| c.name.as_ref())
                .is_some_and(|n| n.matches(name, case));
            if matched {
                return Some(child);
            }
        }
        None
    }

    /// Insert a fresh slot, parented to the root container, with its
    /// entity marked loaned (the caller holds the box for the
    /// `on_register` hook).
    fn install(&mut self, id: EntityId) {
        let root = self.config.root_id;
        self.slots.insert(
            id,
            Slot {
                state: SlotState::Loaned,
                name: None,
                parent: Some(root),
                children: Vec::new(),
            },
        );
        self.slots
            .get_mut(&root)
            .expect("root container is gone")
            .children
            .push(id);
    }
}

/// Owner of all entities and both lookup dictionaries.
///
/// All operations take `&self`; share a registry between threads with
/// `Arc`. See the module docs for the locking model.
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    /// Create a registry with the root container installed.
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let root_name = Name::new(&config.root_name).map_err(|_| ConfigError::InvalidRootName)?;

        let mut slots = IndexMap::new();
        slots.insert(
            config.root_id,
            Slot {
                state: SlotState::Occupied(Box::new(Group)),
                name: Some(root_name),
                parent: None,
                children: Vec::new(),
            },
        );
        Ok(Self {
            inner: Mutex::new(RegistryInner {
                next_dynamic: config.first_dynamic_id.get(),
                config,
                slots,
            }),
        })
    }

    /// Id of the root container.
    pub fn root(&self) -> EntityId {
        self.lock().root()
    }

    /// Register an entity under a freshly allocated dynamic id.
    ///
    /// The entity is installed in the id dictionary parented to the root
    /// container, then its `on_register` hook runs outside the lock.
    /// Dynamic ids are strictly increasing and never reused.
    pub fn register(&self, entity: Box<dyn Entity>) -> EntityId {
        let id = {
            let mut inner = self.lock();
            let id = EntityId(inner.next_dynamic);
            inner.next_dynamic += 1;
            inner.install(id);
            id
        };
        self.finish_register(id, entity)
    }

    /// Register an entity under a statically assigned well-known id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is at or above the dynamic watermark, or if the id
    /// is already registered; a duplicate id is a broken invariant the
    /// registry cannot repair.
    pub fn register_with_id(&self, id: EntityId, entity: Box<dyn Entity>) -> EntityId {
        {
            let mut inner = self.lock();
            assert!(
                id < inner.config.first_dynamic_id,
                "id {id} is not in the well-known pool"
            );
            assert!(
                !inner.slots.contains_key(&id),
                "duplicate registration for id {id}"
            );
            inner.install(id);
        }
        self.finish_register(id, entity)
    }

    fn finish_register(&self, id: EntityId, mut entity: Box<dyn Entity>) -> EntityId {
        entity.on_register(id);
        self.restore(id, entity);
        id
    }

    /// Remove an entity and, recursively, all of its children.
    ///
    /// Returns every id that was destroyed (children before parents) so
    /// the caller can cancel pending events against each of them. Once
    /// this returns (and already during the `on_unregister` hooks),
    /// none of the removed ids resolve by id or by name.
    ///
    /// Idempotent: an unknown or already-removed id returns an empty vec.
    /// Removing the root container tears down the whole tree.
    pub fn remove(&self, id: EntityId) -> Vec<EntityId> {
        let mut torn_down: Vec<(EntityId, Option<Box<dyn Entity>>)> = Vec::new();
        {
            let mut inner = self.lock();
            if !inner.is_live(id) {
                return Vec::new();
            }

            // Subtree in preorder; walked in reverse below so children
            // come down before their parents.
            let mut order: Vec<EntityId> = Vec::new();
            let mut stack: SmallVec<[EntityId; 8]> = SmallVec::new();
            stack.push(id);
            while let Some(cur) = stack.pop() {
                order.push(cur);
                if let Some(slot) = inner.slots.get(&cur) {
                    stack.extend(slot.children.iter().copied());
                }
            }

            if let Some(parent) = inner.slots.get(&id).and_then(|s| s.parent) {
                if let Some(pslot) = inner.slots.get_mut(&parent) {
                    pslot.children.retain(|&c| c != id);
                }
            }

            for &cur in order.iter().rev() {
                let state = match inner.slots.get_mut(&cur) {
                    Some(slot) => std::mem::replace(&mut slot.state, SlotState::Condemned),
                    None => continue,
                };
                match state {
                    SlotState::Occupied(entity) => {
                        inner.slots.swap_remove(&cur);
                        torn_down.push((cur, Some(entity)));
                    }
                    SlotState::Loaned => {
                        // The box is out with a dispatcher; the slot stays
                        // condemned until the loan returns and drops it.
                        if let Some(slot) = inner.slots.get_mut(&cur) {
                            slot.name = None;
                            slot.parent = None;
                            slot.children.clear();
                        }
                        torn_down.push((cur, None));
                    }
                    SlotState::Condemned => {}
                }
            }
        }

        let mut ids = Vec::with_capacity(torn_down.len());
        for (cur, entity) in torn_down {
            if let Some(mut entity) = entity {
                entity.on_unregister();
            }
            ids.push(cur);
        }
        ids
    }

    /// Whether `id` resolves to a live entity. O(1).
    pub fn contains(&self, id: EntityId) -> bool {
        self.lock().is_live(id)
    }

    /// Take exclusive access to an entity.
    ///
    /// Returns `None` for a dead id, or if the entity is already loaned
    /// out; an entity is exclusively loaned for the duration of its own
    /// dispatch. The loan restores the entity to its slot on drop.
    pub fn loan(&self, id: EntityId) -> Option<EntityLoan<'_>> {
        let mut inner = self.lock();
        let slot = inner.slots.get_mut(&id)?;
        match std::mem::replace(&mut slot.state, SlotState::Loaned) {
            SlotState::Occupied(entity) => Some(EntityLoan {
                registry: self,
                id,
                entity: Some(entity),
            }),
            other => {
                slot.state = other;
                None
            }
        }
    }

    /// Run `f` with exclusive access to the entity, if it is live and
    /// not already loaned.
    pub fn with_mut<R>(&self, id: EntityId, f: impl FnOnce(&mut dyn Entity) -> R) -> Option<R> {
        let mut loan = self.loan(id)?;
        Some(f(loan.entity_mut()))
    }

    /// Set, change, or clear (`None`) an entity's name.
    ///
    /// Atomically swaps the name entry; the id dictionary is untouched
    /// and no event is generated. Fails with `NameTaken` if a direct
    /// sibling already holds the name, in which case the old name is
    /// retained.
    pub fn rename(&self, id: EntityId, new_name: Option<&str>) -> Result<(), RegistryError> {
        let name = match new_name {
            Some(s) => Some(Name::new(s)?),
            None => None,
        };
        let mut inner = self.lock();
        if !inner.is_live(id) {
            return Err(RegistryError::UnknownEntity(id));
        }
        if let Some(ref name) = name {
            let parent = inner.slots.get(&id).and_then(|s| s.parent);
            if let Some(parent) = parent {
                if let Some(existing) = inner.child_by_name(parent, name.as_str(), NameCase::Sensitive)
                {
                    if existing != id {
                        return Err(RegistryError::NameTaken {
                            parent,
                            name: name.as_str().to_owned(),
                        });
                    }
                }
            }
        }
        inner.slots.get_mut(&id).expect("checked live above").name = name;
        Ok(())
    }

    /// Reparent an entity under a different container.
    ///
    /// Fails with `WouldCycle` if `new_parent` is the entity itself or
    /// one of its descendants (which also covers any attempt to move the
    /// root container), and with `NameTaken` if a child of `new_parent`
    /// already holds the entity's name.
    pub fn move_to(&self, id: EntityId, new_parent: EntityId) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if !inner.is_live(id) {
            return Err(RegistryError::UnknownEntity(id));
        }
        if !inner.is_live(new_parent) {
            return Err(RegistryError::UnknownEntity(new_parent));
        }

        let mut cursor = Some(new_parent);
        while let Some(cur) = cursor {
            if cur == id {
                return Err(RegistryError::WouldCycle {
                    entity: id,
                    parent: new_parent,
                });
            }
            cursor = inner.slots.get(&cur).and_then(|s| s.parent);
        }

        if let Some(name) = inner.slots.get(&id).and_then(|s| s.name.clone()) {
            if let Some(existing) =
                inner.child_by_name(new_parent, name.as_str(), NameCase::Sensitive)
            {
                if existing != id {
                    return Err(RegistryError::NameTaken {
                        parent: new_parent,
                        name: name.as_str().to_owned(),
                    });
                }
            }
        }

        let old_parent = inner.slots.get(&id).and_then(|s| s.parent);
        if old_parent == Some(new_parent) {
            return Ok(());
        }
        if let Some(old_parent) = old_parent {
            if let Some(pslot) = inner.slots.get_mut(&old_parent) {
                pslot.children.retain(|&c| c != id);
            }
        }
        inner
            .slots
            .get_mut(&new_parent)
            .expect("checked live above")
            .children
            .push(id);
        inner.slots.get_mut(&id).expect("checked live above").parent = Some(new_parent);
        Ok(())
    }

    /// The entity's current name, if any.
    pub fn name_of(&self, id: EntityId) -> Option<Name> {
        self.lock().slots.get(&id).and_then(|s| s.name.clone())
    }

    /// The entity's parent container. `None` for the root or a dead id.
    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.lock().slots.get(&id).and_then(|s| s.parent)
    }

    /// Direct children of a container, in insertion order.
    pub fn children_of(&self, id: EntityId) -> Vec<EntityId> {
        self.lock()
            .slots
            .get(&id)
            .map(|s| s.children.clone())
            .unwrap_or_default()
    }

    /// First direct child of `parent` matching `name` under `case`.
    pub fn child_by_name(&self, parent: EntityId, name: &str, case: NameCase) -> Option<EntityId> {
        self.lock().child_by_name(parent, name, case)
    }

    /// Number of live entities, the root container included.
    pub fn live_count(&self) -> usize {
        self.lock().slots.values().filter(|s| s.is_live()).count()
    }

    /// A name not yet taken among `parent`'s direct children.
    ///
    /// Returns `base` itself when free; otherwise bumps (or appends) a
    /// numeric suffix until a free name is found. `None` if `parent` is
    /// not live.
    pub fn unique_name(&self, parent: EntityId, base: &str) -> Option<String> {
        let inner = self.lock();
        if !inner.is_live(parent) {
            return None;
        }
        if is_valid_name(base) && inner.child_by_name(parent, base, NameCase::Sensitive).is_none() {
            return Some(base.to_owned());
        }
        let stem_end = base.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (stem, suffix) = base.split_at(stem_end);
        let mut n: u64 = suffix.parse().map(|v: u64| v + 1).unwrap_or(1);
        loop {
            let candidate = format!("{stem}{n}");
            if inner
                .child_by_name(parent, &candidate, NameCase::Sensitive)
                .is_none()
            {
                return Some(candidate);
            }
            n += 1;
        }
    }

    /// Resolve a `/`-delimited name path (see [`crate::path`] grammar).
    /// Fails softly at the first unresolvable segment.
    pub fn find_by_path(&self, path: &str) -> Option<EntityId> {
        self.lock().resolve_path(path, NameCase::Sensitive)
    }

    /// [`find_by_path`](Registry::find_by_path) with ASCII
    /// case-insensitive name comparison.
    pub fn find_by_path_any_case(&self, path: &str) -> Option<EntityId> {
        self.lock().resolve_path(path, NameCase::Insensitive)
    }

    /// Return a loaned entity to its slot, or finish tearing it down if
    /// it was removed while out.
    fn restore(&self, id: EntityId, entity: Box<dyn Entity>) {
        let mut entity = entity;
        {
            let mut inner = self.lock();
            if let Some(slot) = inner.slots.get_mut(&id) {
                if matches!(slot.state, SlotState::Loaned) {
                    slot.state = SlotState::Occupied(entity);
                    return;
                }
                // Condemned: removed while loaned out.
                inner.slots.swap_remove(&id);
            }
        }
        entity.on_unregister();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().expect("registry lock poisoned")
    }
}

/// Exclusive RAII access to one entity.
///
/// While the loan is live the entity stays resolvable by id and name,
/// but further loans of it fail. Dropping the loan restores the entity
/// to its slot, or drops it if it was removed in the meantime.
pub struct EntityLoan<'a> {
    registry: &'a Registry,
    id: EntityId,
    entity: Option<Box<dyn Entity>>,
}

impl EntityLoan<'_> {
    /// The loaned entity's id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Borrow the entity.
    pub fn entity(&self) -> &dyn Entity {
        self.entity.as_deref().expect("loan already returned")
    }

    /// Mutably borrow the entity.
    pub fn entity_mut(&mut self) -> &mut dyn Entity {
        self.entity.as_deref_mut().expect("loan already returned")
    }
}

impl Drop for EntityLoan<'_> {
    fn drop(&mut self) {
        if let Some(entity) = self.entity.take() {
            self.registry.restore(self.id, entity);
        }
    }
}
