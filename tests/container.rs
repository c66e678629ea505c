//! # Tree Container Tests
//!
//! This module tests the child-sequence semantics of the container:
//! 1. add/insert de-duplication (existing children are moved, not copied)
//! 2. Import with auto-detach-and-reparent across trees
//! 3. Owner propagation at attach time, including documented staleness
//! 4. Sequence edits (delete, move_child, exchange, clear) and their
//!    error reporting
//! 5. Cycle rejection on attach
//!
//! ## Requirements Tested
//!
//! - R1: `add(child)` sets `child.owner` to the attaching node's own owner
//!   (or the attaching node itself if it is a root)
//! - R2: inserting a node that is already a child reorders it without
//!   changing the child count
//! - R3: index-out-of-range and not-found conditions are reported as
//!   container errors, never silently ignored
//! - R4: `owner` is recorded at attach time and never recomputed

use arbor::{ContainerError, Node};

fn node_with_payload(payload: &[u8]) -> Node {
    let node = Node::new().unwrap();
    node.write_all(payload).unwrap();
    node
}

mod attach_tests {
    use super::*;

    #[test]
    fn add_appends_and_returns_index() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        let b = Node::new().unwrap();

        assert_eq!(root.add(&a).unwrap(), 0);
        assert_eq!(root.add(&b).unwrap(), 1);
        assert_eq!(root.child_count(), 2);
        assert!(root.child(0).unwrap().ptr_eq(&a));
        assert!(root.child(1).unwrap().ptr_eq(&b));
    }

    #[test]
    fn add_existing_child_returns_its_index() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        let b = Node::new().unwrap();
        root.add(&a).unwrap();
        root.add(&b).unwrap();

        assert_eq!(root.add(&a).unwrap(), 0, "re-adding SHOULD return the existing index");
        assert_eq!(root.child_count(), 2, "re-adding SHOULD NOT duplicate the child");
    }

    #[test]
    fn add_sets_parent_edge() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        root.add(&a).unwrap();

        assert!(a.parent().unwrap().ptr_eq(&root));
        assert!(root.parent().is_none());
    }

    #[test]
    fn add_moves_node_between_parents() {
        let p1 = Node::new().unwrap();
        let p2 = Node::new().unwrap();
        let x = node_with_payload(&[1, 2, 3]);

        p1.add(&x).unwrap();
        p2.add(&x).unwrap();

        assert_eq!(p1.child_count(), 0, "old parent SHOULD lose the child");
        assert_eq!(p2.child_count(), 1);
        assert!(x.parent().unwrap().ptr_eq(&p2));
        assert_eq!(x.read_all().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn insert_existing_child_moves_it() {
        let p = Node::new().unwrap();
        let x = Node::new().unwrap();
        let y = Node::new().unwrap();
        let z = Node::new().unwrap();
        p.add(&x).unwrap();
        p.add(&y).unwrap();
        p.add(&z).unwrap();

        p.insert(0, &z).unwrap();

        assert_eq!(p.child_count(), 3, "moving an existing child SHOULD NOT change the count");
        assert!(p.child(0).unwrap().ptr_eq(&z));
        assert!(p.child(1).unwrap().ptr_eq(&x));
        assert!(p.child(2).unwrap().ptr_eq(&y));
    }

    #[test]
    fn insert_at_end_appends() {
        let p = Node::new().unwrap();
        let x = Node::new().unwrap();
        let y = Node::new().unwrap();
        p.add(&x).unwrap();

        p.insert(1, &y).unwrap();
        assert!(p.child(1).unwrap().ptr_eq(&y));
    }

    #[test]
    fn insert_past_end_is_rejected() {
        let p = Node::new().unwrap();
        let x = Node::new().unwrap();

        let err = p.insert(1, &x).unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ContainerError>(),
                Some(ContainerError::IndexOutOfRange { index: 1, count: 0 })
            ),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn self_attach_is_rejected() {
        let root = Node::new().unwrap();

        let err = root.add(&root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContainerError>(),
            Some(ContainerError::WouldCycle)
        ));
    }

    #[test]
    fn attaching_ancestor_beneath_descendant_is_rejected() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        let b = Node::new().unwrap();
        root.add(&a).unwrap();
        a.add(&b).unwrap();

        let err = b.add(&root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContainerError>(),
            Some(ContainerError::WouldCycle)
        ));
        assert_eq!(b.child_count(), 0);
    }
}

mod owner_tests {
    use super::*;

    #[test]
    fn owner_of_direct_child_is_the_root() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        root.add(&a).unwrap();

        assert!(a.owner().unwrap().ptr_eq(&root));
        assert!(root.owner().is_none(), "a root SHOULD have no owner");
    }

    #[test]
    fn owner_propagates_to_grandchildren() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        let g = Node::new().unwrap();
        root.add(&a).unwrap();
        a.add(&g).unwrap();

        assert!(
            g.owner().unwrap().ptr_eq(&root),
            "owner SHOULD be the topmost ancestor, not the immediate parent"
        );
    }

    #[test]
    fn attach_order_determines_owner() {
        // Attaching a subtree that was built before its root was attached:
        // the grandchild's owner is recorded when *it* is attached.
        let a = Node::new().unwrap();
        let g = Node::new().unwrap();
        a.add(&g).unwrap();
        assert!(g.owner().unwrap().ptr_eq(&a), "a was a root when g attached");

        let root = Node::new().unwrap();
        root.add(&a).unwrap();
        assert!(a.owner().unwrap().ptr_eq(&root));
        assert!(
            g.owner().unwrap().ptr_eq(&a),
            "owner is never recomputed: g keeps the owner recorded at attach time"
        );
    }

    #[test]
    fn reparenting_ancestor_leaves_descendant_owner_stale() {
        let r1 = Node::new().unwrap();
        let a = Node::new().unwrap();
        let g = Node::new().unwrap();
        r1.add(&a).unwrap();
        a.add(&g).unwrap();
        assert!(g.owner().unwrap().ptr_eq(&r1));

        let r2 = Node::new().unwrap();
        r2.add(&a).unwrap();

        assert!(a.owner().unwrap().ptr_eq(&r2));
        assert!(
            g.owner().unwrap().ptr_eq(&r1),
            "documented legacy behavior: cached owner goes stale on reparent"
        );
    }

    #[test]
    fn extract_clears_parent_and_owner() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        root.add(&a).unwrap();

        root.extract(&a).unwrap();

        assert!(a.parent().is_none());
        assert!(a.owner().is_none());
        assert_eq!(root.child_count(), 0);
    }
}

mod sequence_edit_tests {
    use super::*;

    #[test]
    fn delete_destroys_child_at_index() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        let b = Node::new().unwrap();
        root.add(&a).unwrap();
        root.add(&b).unwrap();

        root.delete(0).unwrap();

        assert_eq!(root.child_count(), 1);
        assert!(root.child(0).unwrap().ptr_eq(&b));
    }

    #[test]
    fn delete_out_of_range_is_rejected() {
        let root = Node::new().unwrap();
        let err = root.delete(0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContainerError>(),
            Some(ContainerError::IndexOutOfRange { index: 0, count: 0 })
        ));
    }

    #[test]
    fn move_child_reorders() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        let b = Node::new().unwrap();
        let c = Node::new().unwrap();
        root.add(&a).unwrap();
        root.add(&b).unwrap();
        root.add(&c).unwrap();

        root.move_child(2, 0).unwrap();

        assert!(root.child(0).unwrap().ptr_eq(&c));
        assert!(root.child(1).unwrap().ptr_eq(&a));
        assert!(root.child(2).unwrap().ptr_eq(&b));
    }

    #[test]
    fn exchange_swaps() {
        let root = Node::new().unwrap();
        let a = Node::new().unwrap();
        let b = Node::new().unwrap();
        root.add(&a).unwrap();
        root.add(&b).unwrap();

        root.exchange(0, 1).unwrap();

        assert!(root.child(0).unwrap().ptr_eq(&b));
        assert!(root.child(1).unwrap().ptr_eq(&a));
    }

    #[test]
    fn clear_empties_the_sequence() {
        let root = Node::new().unwrap();
        root.add(&Node::new().unwrap()).unwrap();
        root.add(&Node::new().unwrap()).unwrap();

        root.clear();
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn extract_of_non_child_is_rejected() {
        let root = Node::new().unwrap();
        let stranger = Node::new().unwrap();

        let err = root.extract(&stranger).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContainerError>(),
            Some(ContainerError::NotAChild)
        ));
    }

    #[test]
    fn remove_detaches_and_destroys() {
        let root = Node::new().unwrap();
        let a = node_with_payload(&[1]);
        root.add(&a).unwrap();

        root.remove(&a).unwrap();
        assert_eq!(root.child_count(), 0);
    }
}
