//! Prefetch window around the focused item.

use crate::domain::entities::Priority;

/// Items kept warm behind the focused one.
pub const DEFAULT_BACK: usize = 2;

/// Items kept warm ahead of the focused one.
pub const DEFAULT_FORWARD: usize = 3;

/// One index selected by a window, with its distance from the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSlot {
    /// Index into the item list.
    pub index: usize,
    /// Absolute distance from the center index.
    pub distance: usize,
}

/// Asymmetric window of list indices around a center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusWindow {
    /// Radius behind the center.
    pub back: usize,
    /// Radius ahead of the center.
    pub forward: usize,
}

impl Default for FocusWindow {
    fn default() -> Self {
        Self::new(DEFAULT_BACK, DEFAULT_FORWARD)
    }
}

impl FocusWindow {
    /// Creates a window with the given radii.
    #[must_use]
    pub const fn new(back: usize, forward: usize) -> Self {
        Self { back, forward }
    }

    /// Selects `{center - back, ..., center + forward}` clipped to `[0, len)`.
    ///
    /// Slots come nearest first; on equal distance the forward neighbour
    /// precedes the backward one.
    #[must_use]
    pub fn slots(&self, center: usize, len: usize) -> Vec<WindowSlot> {
        let mut slots = Vec::with_capacity(self.back + self.forward + 1);
        let reach = self.back.max(self.forward);

        for distance in 0..=reach {
            if distance <= self.forward
                && let Some(index) = center.checked_add(distance)
                && index < len
            {
                slots.push(WindowSlot { index, distance });
            }

            if distance > 0
                && distance <= self.back
                && let Some(index) = center.checked_sub(distance)
                && index < len
            {
                slots.push(WindowSlot { index, distance });
            }
        }

        slots
    }

    /// Indices selected around `center`, ascending.
    #[must_use]
    pub fn indices(&self, center: usize, len: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = self.slots(center, len).iter().map(|s| s.index).collect();
        indices.sort_unstable();
        indices
    }
}

/// Priority and target width for one distance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    /// Queue priority.
    pub priority: Priority,
    /// Requested pixel width.
    pub width: u32,
}

/// Distance-dependent prefetch sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionTiers {
    /// The focused item itself.
    pub center: Tier,
    /// Immediate neighbours.
    pub near: Tier,
    /// Everything further away.
    pub far: Tier,
}

impl Default for ResolutionTiers {
    fn default() -> Self {
        Self::with_widths(1200, 800, 600)
    }
}

impl ResolutionTiers {
    /// Canonical priorities with custom widths.
    #[must_use]
    pub const fn with_widths(center: u32, near: u32, far: u32) -> Self {
        Self {
            center: Tier {
                priority: Priority::High,
                width: center,
            },
            near: Tier {
                priority: Priority::High,
                width: near,
            },
            far: Tier {
                priority: Priority::Low,
                width: far,
            },
        }
    }

    /// Tier for an item `distance` steps from the center.
    #[must_use]
    pub const fn for_distance(&self, distance: usize) -> Tier {
        match distance {
            0 => self.center,
            1 => self.near,
            _ => self.far,
        }
    }
}
