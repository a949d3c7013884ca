//! Shape matching against a grid view.
//!
//! Each matcher returns the member positions of every group of its shape that
//! contains the trigger and shares the trigger's category. Group sizes and
//! tiers are judged by the engine, not here.

use std::collections::{BTreeSet, VecDeque};

use blocklife_types::{Category, Direction, Entity, GridView, Position};

use crate::config::PatternShape;
use crate::error::PatternError;

/// Candidate member sets for `shape` at `trigger`, each sorted by position.
pub fn match_shape<V: GridView + ?Sized>(
    view: &V,
    shape: &PatternShape,
    trigger: Position,
    category: Category,
) -> Vec<Vec<Position>> {
    match shape {
        PatternShape::Cluster => vec![cluster(view, trigger, category)],
        PatternShape::Line { .. } => lines(view, trigger, category),
        PatternShape::Template { cells } => templates(view, cells, trigger, category),
    }
}

fn has_category<V: GridView + ?Sized>(view: &V, position: Position, category: Category) -> bool {
    view.entity_at(position)
        .is_some_and(|entity| entity.category() == category)
}

/// Flood fill over 4-connected cells of the same category.
fn cluster<V: GridView + ?Sized>(view: &V, trigger: Position, category: Category) -> Vec<Position> {
    let mut seen = BTreeSet::from([trigger]);
    let mut frontier = VecDeque::from([trigger]);

    while let Some(current) = frontier.pop_front() {
        for dir in Direction::all() {
            let Some(next) = current.step(dir) else {
                continue;
            };
            if !seen.contains(&next) && has_category(view, next, category) {
                seen.insert(next);
                frontier.push_back(next);
            }
        }
    }

    seen.into_iter().collect()
}

/// Extend from the trigger in both directions along one axis.
fn run<V: GridView + ?Sized>(
    view: &V,
    trigger: Position,
    category: Category,
    backward: Direction,
) -> Vec<Position> {
    let mut members = vec![trigger];
    for dir in [backward, backward.opposite()] {
        let mut cursor = trigger;
        while let Some(next) = cursor.step(dir) {
            if !has_category(view, next, category) {
                break;
            }
            members.push(next);
            cursor = next;
        }
    }
    members.sort_unstable();
    members
}

fn lines<V: GridView + ?Sized>(view: &V, trigger: Position, category: Category) -> Vec<Vec<Position>> {
    vec![
        run(view, trigger, category, Direction::West),
        run(view, trigger, category, Direction::North),
    ]
}

fn templates<V: GridView + ?Sized>(
    view: &V,
    cells: &[Position],
    trigger: Position,
    category: Category,
) -> Vec<Vec<Position>> {
    let mut found = Vec::new();
    for anchor_cell in cells {
        // Place the template so that `anchor_cell` lands on the trigger.
        let Some(origin) = trigger.offset(anchor_cell.x.wrapping_neg(), anchor_cell.y.wrapping_neg())
        else {
            continue;
        };
        let members: Option<Vec<Position>> = cells
            .iter()
            .map(|cell| {
                origin
                    .offset(cell.x, cell.y)
                    .filter(|&p| has_category(view, p, category))
            })
            .collect();
        if let Some(mut members) = members {
            members.sort_unstable();
            found.push(members);
        }
    }
    found
}

/// Confirm every member shares `expected` and return the member values.
///
/// Grouping already filters by category; this check makes a mixed group an
/// explicit error rather than an impossibility the caller has to trust.
pub fn ensure_homogeneous<V: GridView + ?Sized>(
    view: &V,
    members: &[Position],
    expected: Category,
) -> Result<Vec<Entity>, PatternError> {
    let mut entities = Vec::with_capacity(members.len());
    for &position in members {
        let Some(entity) = view.entity_at(position) else {
            return Err(PatternError::MissingMember { position });
        };
        if entity.category() != expected {
            return Err(PatternError::CategoryMismatch {
                position,
                expected,
                found: entity.category(),
            });
        }
        entities.push(*entity);
    }
    Ok(entities)
}
