//! Arrow router
//!
//! Every arrow kind owns one or more routing policies. A policy is an ordered list of
//! step functions; each step receives the point produced by the previous one together
//! with both endpoint rectangles and returns the next point of the polyline. Paths are
//! pure functions of the endpoints and are recomputed whenever either endpoint moves.

use super::geometry::{Point, Rect};
use super::model::ArrowKind;

/// The two endpoints of an arrow plus routing margins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ends {
    pub source: Rect,
    pub target: Rect,
    /// Gap kept between a detour and the boxes it avoids
    pub clearance: i32,
    /// Length of the final run that carries the arrow head
    pub head: i32,
}

type Step = fn(Point, &Ends) -> Point;

// Starting points

fn source_right(_: Point, e: &Ends) -> Point {
    Point::new(e.source.right(), e.source.mid_y())
}

fn source_center(_: Point, e: &Ends) -> Point {
    Point::new(e.source.mid_x(), e.source.mid_y())
}

fn source_left(_: Point, e: &Ends) -> Point {
    Point::new(e.source.x - 1, e.source.mid_y())
}

fn source_top(_: Point, e: &Ends) -> Point {
    Point::new(e.source.x + 1, e.source.y - 1)
}

// Moves

fn right_by_clearance(p: Point, e: &Ends) -> Point {
    Point::new(p.x + e.clearance, p.y)
}

fn left_by_clearance(p: Point, e: &Ends) -> Point {
    Point::new(p.x - e.clearance, p.y)
}

fn above_both(p: Point, e: &Ends) -> Point {
    Point::new(p.x, e.source.y.min(e.target.y) - e.clearance)
}

fn past_target_right(p: Point, e: &Ends) -> Point {
    Point::new(e.target.right() + e.head, p.y)
}

fn to_target_middle_row(p: Point, e: &Ends) -> Point {
    Point::new(p.x, e.target.mid_y())
}

fn into_target_right(p: Point, e: &Ends) -> Point {
    Point::new(e.target.right() + e.head - 1, p.y)
}

fn into_target_left(p: Point, e: &Ends) -> Point {
    Point::new(e.target.x - e.head, p.y)
}

fn to_target_column(p: Point, e: &Ends) -> Point {
    Point::new(elbow_column(&e.target), p.y)
}

fn into_target_vertically(p: Point, e: &Ends) -> Point {
    if e.target.y > p.y {
        Point::new(p.x, e.target.y - e.head)
    } else {
        Point::new(p.x, e.target.bottom() + e.head - 1)
    }
}

fn onto_target_top(p: Point, e: &Ends) -> Point {
    Point::new(p.x, e.target.y - e.head)
}

fn elbow_column(target: &Rect) -> i32 {
    target.x + (target.width - 1).clamp(0, 1)
}

/// Same row as the target: a straight run into its left edge
const STRAIGHT_RIGHT: &[Step] = &[into_target_left];
/// Target lower or higher to the right: across, then down or up into it
const ELBOW_RIGHT: &[Step] = &[to_target_column, into_target_vertically];
/// Target directly underneath: straight down onto it
const STRAIGHT_DOWN: &[Step] = &[onto_target_top];
/// Target to the left: exit right, climb over both boxes, come back down beside it
const UP_AND_OVER: &[Step] = &[
    right_by_clearance,
    above_both,
    past_target_right,
    to_target_middle_row,
    into_target_right,
];
/// Child frame to parent frame: up into the lane above the title, across, up to the parent
const TO_PARENT: &[Step] = &[to_target_column, into_target_vertically];
/// Stack items sit right of the grid: step left, drop to the target row, run left into it
const FROM_STACK: &[Step] = &[left_by_clearance, to_target_middle_row, into_target_right];

/// Compute the polyline of an arrow; consecutive duplicate points are removed
pub fn route(kind: ArrowKind, ends: &Ends) -> Vec<Point> {
    let (start, policy): (Step, &[Step]) = match kind {
        ArrowKind::FrameToParent => (source_top, TO_PARENT),
        ArrowKind::StackItemToValue | ArrowKind::StackItemToFrame => (source_left, FROM_STACK),
        ArrowKind::BindingToValue | ArrowKind::FunctionToFrame => {
            (source_right, reference_policy(source_right(Point::default(), ends), ends))
        }
        ArrowKind::SlotToValue => (
            source_center,
            reference_policy(source_center(Point::default(), ends), ends),
        ),
    };

    let mut points = Vec::with_capacity(policy.len() + 1);
    let mut current = start(Point::default(), ends);
    points.push(current);
    for step in policy {
        current = step(current, ends);
        if points.last() != Some(&current) {
            points.push(current);
        }
    }
    points
}

fn reference_policy(start: Point, ends: &Ends) -> &'static [Step] {
    let target = &ends.target;
    let column_overlap = start.x >= target.x && start.x < target.right();
    if column_overlap && target.y > ends.source.y {
        STRAIGHT_DOWN
    } else if target.x >= start.x {
        if start.y >= target.y && start.y < target.bottom() {
            STRAIGHT_RIGHT
        } else {
            ELBOW_RIGHT
        }
    } else {
        UP_AND_OVER
    }
}
