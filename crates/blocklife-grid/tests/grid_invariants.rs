//! Property-based tests for the dual-index invariants.
//!
//! Random sequences of place/remove/move operations are applied to a small
//! grid; after every operation both indices must agree exactly.

#![allow(clippy::unwrap_used)]

use blocklife_grid::GridState;
use blocklife_types::{Category, Position};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum GridOp {
    Place(Position, u32),
    Remove(Position),
    Move(Position, Position),
}

/// Positions slightly larger than the 6x6 grid so bounds errors are covered.
fn arb_position() -> impl Strategy<Value = Position> {
    (-1..7i32, -1..7i32).prop_map(|(x, y)| Position::new(x, y))
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<GridOp>> {
    proptest::collection::vec(
        prop_oneof![
            (arb_position(), 1..4u32).prop_map(|(p, kind)| GridOp::Place(p, kind)),
            arb_position().prop_map(GridOp::Remove),
            (arb_position(), arb_position()).prop_map(|(a, b)| GridOp::Move(a, b)),
        ],
        1..=max_ops,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Both indices agree after every operation, successful or not.
    #[test]
    fn indices_agree_after_every_operation(ops in arb_ops(60)) {
        let grid = GridState::new(6, 6).unwrap();

        for op in ops {
            match op {
                GridOp::Place(p, kind) => { let _ = grid.place(p, Category::new(kind, 1)); }
                GridOp::Remove(p) => { let _ = grid.remove(p); }
                GridOp::Move(a, b) => { let _ = grid.move_entity(a, b); }
            }
            prop_assert!(grid.verify_integrity().is_empty());

            for entity in grid.entities() {
                prop_assert_eq!(grid.get_by_position(entity.position()), Some(entity));
                prop_assert_eq!(grid.get_by_id(entity.id()), Some(entity));
            }
        }
    }

    /// A failed operation leaves the grid byte-for-byte unchanged.
    #[test]
    fn failed_operations_do_not_mutate(ops in arb_ops(40)) {
        let grid = GridState::new(6, 6).unwrap();

        for op in ops {
            let before = grid.snapshot();
            let failed = match op {
                GridOp::Place(p, kind) => grid.place(p, Category::new(kind, 1)).is_err(),
                GridOp::Remove(p) => grid.remove(p).is_err(),
                GridOp::Move(a, b) => grid.move_entity(a, b).is_err(),
            };
            if failed {
                prop_assert_eq!(grid.snapshot(), before);
            }
        }
    }

    /// A moved entity keeps its identity and category.
    #[test]
    fn move_preserves_identity(from in arb_position(), to in arb_position()) {
        let grid = GridState::new(6, 6).unwrap();
        let Ok(id) = grid.place(from, Category::new(1, 2)) else {
            return Ok(());
        };

        if let Ok(moved) = grid.move_entity(from, to) {
            prop_assert_eq!(moved.id(), id);
            prop_assert_eq!(moved.category(), Category::new(1, 2));
            prop_assert_eq!(grid.get_by_id(id).map(|e| e.position()), Some(to));
        } else {
            prop_assert_eq!(grid.get_by_id(id).map(|e| e.position()), Some(from));
        }
    }
}
