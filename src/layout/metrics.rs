//! Glyph metrics used by the layout passes.
//!
//! Font lookup lives outside this crate; passes only see the
//! [`GlyphMetrics`] trait. [`UnitMetrics`] derives every size from the
//! configured unit, which is what the passes need when no font is loaded.

use super::constants::*;
use crate::model::NoteData;
use crate::options::LayoutOptions;

pub trait GlyphMetrics {
    /// Half the distance between two staff lines at `staff_size` percent.
    fn drawing_unit(&self, staff_size: i32) -> i32;

    /// Half the drawn width of a note head.
    fn note_radius(&self, note: &NoteData, staff_size: i32) -> i32;

    fn stem_width(&self, staff_size: i32) -> i32;
}

#[derive(Debug, Clone, Copy)]
pub struct UnitMetrics {
    unit: i32,
    stem_width: i32,
}

impl UnitMetrics {
    pub fn new(options: &LayoutOptions) -> Self {
        Self {
            unit: options.unit,
            stem_width: options.stem_width,
        }
    }
}

impl GlyphMetrics for UnitMetrics {
    fn drawing_unit(&self, staff_size: i32) -> i32 {
        self.unit * DEFINITION_FACTOR * staff_size / DEFAULT_STAFF_SIZE
    }

    /// Mensural heads are a square one unit either side of the center.
    fn note_radius(&self, _note: &NoteData, staff_size: i32) -> i32 {
        self.drawing_unit(staff_size)
    }

    fn stem_width(&self, staff_size: i32) -> i32 {
        self.drawing_unit(staff_size) * self.stem_width / DEFINITION_FACTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Duration, Pname};

    #[test]
    fn sizes_scale_with_staff_size() {
        let metrics = UnitMetrics::new(&LayoutOptions::default());
        assert_eq!(metrics.drawing_unit(100), 90);
        assert_eq!(metrics.drawing_unit(50), 45);
        assert_eq!(metrics.stem_width(100), 18);
        let note = NoteData::new(Pname::C, 4, Duration::Brevis);
        assert_eq!(metrics.note_radius(&note, 100), 90);
    }
}
