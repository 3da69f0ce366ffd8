//! Name-path resolution.
//!
//! The committed grammar, embedded literally by script code:
//!
//! - A leading `/` anchors resolution at the root container.
//! - A leading digit run (up to the next `/` or the end) is a numeric
//!   [`EntityId`]; any remaining segments resolve among that entity's
//!   children.
//! - Otherwise every `/`-segment is a name lookup among the current
//!   container's direct children, starting from the root container.
//!
//! Resolution fails softly: `None` at the first unresolvable segment,
//! never a partial result. Empty segments (`"a//b"`, a trailing `/`, or
//! a bare `/`) do not resolve.

use knell_core::EntityId;

use crate::name::NameCase;
use crate::registry::RegistryInner;

impl RegistryInner {
    pub(crate) fn resolve_path(&self, path: &str, case: NameCase) -> Option<EntityId> {
        let mut rest = path;
        let mut cursor = self.root();

        if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else if rest.starts_with(|c: char| c.is_ascii_digit()) {
            let seg_end = rest.find('/').unwrap_or(rest.len());
            let id: u64 = rest[..seg_end].parse().ok()?;
            cursor = EntityId(id);
            if !self.is_live(cursor) {
                return None;
            }
            if seg_end == rest.len() {
                return Some(cursor);
            }
            rest = &rest[seg_end + 1..];
        }

        for segment in rest.split('/') {
            if segment.is_empty() {
                return None;
            }
            cursor = self.child_by_name(cursor, segment, case)?;
        }
        Some(cursor)
    }
}

#[cfg(test)]
mod tests {
    use knell_core::Entity;

    use crate::config::RegistryConfig;
    use crate::registry::{Group, Registry};

    use super::*;

    fn named_group(reg: &Registry, parent: EntityId, name: &str) -> EntityId {
        let id = reg.register(Box::new(Group));
        reg.move_to(id, parent).unwrap();
        reg.rename(id, Some(name)).unwrap();
        id
    }

    fn tree() -> (Registry, EntityId, EntityId, EntityId) {
        let reg = Registry::new(RegistryConfig::default()).unwrap();
        let a = named_group(&reg, reg.root(), "a");
        let b = named_group(&reg, a, "b");
        let c = named_group(&reg, b, "c");
        (reg, a, b, c)
    }

    // ── name segments ──────────────────────────────────────────

    #[test]
    fn resolves_nested_names() {
        let (reg, a, b, c) = tree();
        assert_eq!(reg.find_by_path("/a"), Some(a));
        assert_eq!(reg.find_by_path("/a/b"), Some(b));
        assert_eq!(reg.find_by_path("/a/b/c"), Some(c));
    }

    #[test]
    fn leading_slash_is_optional_for_name_paths() {
        let (reg, _, _, c) = tree();
        assert_eq!(reg.find_by_path("a/b/c"), Some(c));
    }

    #[test]
    fn missing_middle_segment_fails_entirely() {
        let (reg, _, _, _) = tree();
        assert_eq!(reg.find_by_path("/a/nope/c"), None);
        assert_eq!(reg.find_by_path("/nope"), None);
    }

    #[test]
    fn names_resolve_only_among_direct_children() {
        let (reg, _, _, _) = tree();
        // "c" is a grandchild of "a", not a direct child.
        assert_eq!(reg.find_by_path("/a/c"), None);
        assert_eq!(reg.find_by_path("/c"), None);
    }

    #[test]
    fn empty_segments_do_not_resolve() {
        let (reg, _, _, _) = tree();
        assert_eq!(reg.find_by_path("/"), None);
        assert_eq!(reg.find_by_path(""), None);
        assert_eq!(reg.find_by_path("/a/"), None);
        assert_eq!(reg.find_by_path("a//b"), None);
    }

    // ── id segments ────────────────────────────────────────────

    #[test]
    fn bare_id_resolves() {
        let (reg, a, _, _) = tree();
        assert_eq!(reg.find_by_path(&a.to_string()), Some(a));
    }

    #[test]
    fn id_prefix_resolves_relative_remainder() {
        let (reg, a, b, c) = tree();
        assert_eq!(reg.find_by_path(&format!("{a}/b")), Some(b));
        assert_eq!(reg.find_by_path(&format!("{a}/b/c")), Some(c));
        assert_eq!(reg.find_by_path(&format!("{b}/nope")), None);
    }

    #[test]
    fn dead_or_unknown_id_fails() {
        let (reg, a, _, _) = tree();
        reg.remove(a);
        assert_eq!(reg.find_by_path(&a.to_string()), None);
        assert_eq!(reg.find_by_path("123456789"), None);
    }

    #[test]
    fn malformed_id_segment_fails() {
        let (reg, _, _, _) = tree();
        // Names may not start with a digit, so this can match nothing.
        assert_eq!(reg.find_by_path("12abc"), None);
    }

    // ── case rules ─────────────────────────────────────────────

    #[test]
    fn case_insensitive_lookup_is_a_separate_entry_point() {
        let (reg, _, b, _) = tree();
        assert_eq!(reg.find_by_path("/A/B"), None);
        assert_eq!(reg.find_by_path_any_case("/A/B"), Some(b));
    }

    #[test]
    fn path_equals_id_lookup() {
        // Resolving by path and holding the id must agree.
        let (reg, _, _, c) = tree();
        let by_path = reg.find_by_path("/a/b/c").unwrap();
        assert_eq!(by_path, c);
        assert!(reg.contains(by_path));
    }

    // ── proptest ───────────────────────────────────────────────

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_name() -> impl Strategy<Value = String> {
            "[a-z_][a-z0-9_]{0,8}"
        }

        proptest! {
            /// Chaining registered names always resolves to the leaf, and
            /// breaking any one segment makes the whole path unresolvable.
            #[test]
            fn chains_resolve_exactly(names in prop::collection::vec(arb_name(), 1..6)) {
                let reg = Registry::new(RegistryConfig::default()).unwrap();
                let mut parent = reg.root();
                let mut leaf = parent;
                let mut ok = true;
                for name in &names {
                    let id = reg.register(Box::new(Group) as Box<dyn Entity>);
                    reg.move_to(id, parent).unwrap();
                    if reg.rename(id, Some(name)).is_err() {
                        // Duplicate segment name within the chain; skip.
                        ok = false;
                        break;
                    }
                    parent = id;
                    leaf = id;
                }
                prop_assume!(ok);

                let path = format!("/{}", names.join("/"));
                prop_assert_eq!(reg.find_by_path(&path), Some(leaf));

                let mut broken = names.clone();
                let mid = broken.len() / 2;
                broken[mid] = format!("{}x_missing", broken[mid]);
                let broken_path = format!("/{}", broken.join("/"));
                prop_assert_eq!(reg.find_by_path(&broken_path), None);
            }
        }
    }
}
