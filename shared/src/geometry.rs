//! Axis-aligned bounding boxes shared by physics, tagging and pickups.

use serde::{Deserialize, Serialize};

/// Position and size of anything placed in the world.
///
/// `x`/`y` is the top-left corner; y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Open-interval overlap: boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.overlaps_horizontally(other)
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// Closed-interval overlap: touching edges count as contact.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }

    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.left() < other.right() && other.left() < self.right()
    }

    /// How far this box's bottom edge has sunk below `other`'s top edge.
    /// Negative when the box is still above it.
    pub fn penetration_from_above(&self, other: &Rect) -> f32 {
        self.bottom() - other.top()
    }
}

/// Anything that occupies a box in the world.
pub trait Bounded {
    fn bounds(&self) -> Rect;
}

impl Bounded for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

pub fn overlaps(a: &impl Bounded, b: &impl Bounded) -> bool {
    a.bounds().overlaps(&b.bounds())
}

pub fn intersects(a: &impl Bounded, b: &impl Bounded) -> bool {
    a.bounds().intersects(&b.bounds())
}
