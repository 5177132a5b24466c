//! Horizontal bookkeeping shared by the layout passes: the per-system store
//! of measured floating elements and the per-measure alignment grid.

use serde::Serialize;

use crate::model::ElementId;

// ═══════════════════════════════════════════════════════════════════════
// Floating positioners
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoundingBox {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

/// Measured box of one drawn occurrence of a floating element on one staff.
/// `element` is a back-reference; the system aligner owns the positioner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingPositioner {
    pub system: ElementId,
    pub staff_n: i32,
    pub element: ElementId,
    pub bbox: BoundingBox,
    pub has_content: bool,
}

impl FloatingPositioner {
    pub fn content_left(&self) -> i32 {
        self.bbox.left
    }

    pub fn content_right(&self) -> i32 {
        self.bbox.right
    }
}

/// Positioners of one system, filled by the measurement step and cleared by
/// the reset pass.
#[derive(Debug, Clone, Default)]
pub struct SystemAligner {
    positioners: Vec<FloatingPositioner>,
}

impl SystemAligner {
    /// Register a positioner. A second registration for the same element and
    /// staff replaces the first one in place.
    pub fn add_positioner(&mut self, positioner: FloatingPositioner) {
        match self
            .positioners
            .iter_mut()
            .find(|p| p.element == positioner.element && p.staff_n == positioner.staff_n)
        {
            Some(existing) => *existing = positioner,
            None => self.positioners.push(positioner),
        }
    }

    /// All positioners of `element`, one per staff, in insertion order.
    pub fn find_all_positioners_pointing_to(&self, element: ElementId) -> Vec<FloatingPositioner> {
        self.positioners
            .iter()
            .filter(|p| p.element == element)
            .copied()
            .collect()
    }

    pub fn positioners(&self) -> &[FloatingPositioner] {
        &self.positioners
    }

    pub fn reset(&mut self) {
        self.positioners.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Measure alignment grid
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlignmentType {
    Default,
    RightBarline,
}

/// Horizontal marker in a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub x_rel: i32,
    pub kind: AlignmentType,
}

/// Request to widen the gap between two alignments by `dist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentAdjustment {
    pub start: usize,
    pub end: usize,
    pub dist: i32,
}

/// Ordered alignments of a measure. The last one is the right barline.
#[derive(Debug, Clone, Default)]
pub struct MeasureAligner {
    alignments: Vec<Alignment>,
}

impl MeasureAligner {
    pub fn from_positions(positions: &[i32]) -> Self {
        let last = positions.len().saturating_sub(1);
        let alignments = positions
            .iter()
            .enumerate()
            .map(|(i, &x_rel)| Alignment {
                x_rel,
                kind: if i == last {
                    AlignmentType::RightBarline
                } else {
                    AlignmentType::Default
                },
            })
            .collect();
        Self { alignments }
    }

    pub fn alignments(&self) -> &[Alignment] {
        &self.alignments
    }

    pub fn right_barline(&self) -> Option<usize> {
        self.alignments
            .iter()
            .rposition(|a| a.kind == AlignmentType::RightBarline)
    }

    /// Position of the right barline, 0 for an empty grid.
    pub fn width(&self) -> i32 {
        self.right_barline()
            .map_or(0, |i| self.alignments[i].x_rel)
    }

    /// Overwrite positions in order; extra positions are ignored.
    pub fn set_positions(&mut self, positions: &[i32]) {
        for (alignment, &x) in self.alignments.iter_mut().zip(positions) {
            alignment.x_rel = x;
        }
    }

    /// Widen each requested range by its `dist`. Alignments inside the range
    /// are stretched proportionally, alignments at or past its end move by
    /// the full `dist`, alignments at or before its start stay put.
    pub fn adjust_proportionally(&mut self, adjustments: &[AlignmentAdjustment]) {
        for adjustment in adjustments {
            if adjustment.dist == 0 {
                continue;
            }
            let (Some(start), Some(end)) = (
                self.alignments.get(adjustment.start).map(|a| a.x_rel),
                self.alignments.get(adjustment.end).map(|a| a.x_rel),
            ) else {
                log::debug!("Alignment adjustment {adjustment:?} out of range");
                continue;
            };
            let length = end - start;
            if length <= 0 {
                log::debug!("Empty alignment range {start}..{end}, adjustment skipped");
                continue;
            }
            let ratio = adjustment.dist as f64 / length as f64;
            for alignment in &mut self.alignments {
                let x = alignment.x_rel;
                if x <= start {
                    continue;
                }
                alignment.x_rel = if x >= end {
                    x + adjustment.dist
                } else {
                    x + ((x - start) as f64 * ratio) as i32
                };
            }
        }
    }

    /// Drop measured positions, keeping the grid itself.
    pub fn reset(&mut self) {
        for alignment in &mut self.alignments {
            alignment.x_rel = 0;
        }
    }
}
