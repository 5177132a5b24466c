//! Shapes and horizontal offsets of the notes of a mensural ligature.
//!
//! Shapes are assigned pair by pair from a fixed rule table, then offsets
//! are laid out left to right from the note widths. Both arrays are rebuilt
//! from scratch on every pass.

use super::constants::*;
use super::metrics::GlyphMetrics;
use crate::document::Document;
use crate::functor::{Functor, FunctorCode};
use crate::model::{
    Duration, ElementId, ElementKind, LigatureForm, LigatureShape, NotationType, NoteData,
};

/// What the rule table needs to know about one note of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LigatureNote {
    pub dur: Duration,
    pub diatonic_pitch: i32,
    pub lig: Option<LigatureForm>,
}

impl From<&NoteData> for LigatureNote {
    fn from(note: &NoteData) -> Self {
        Self {
            dur: note.dur,
            diatonic_pitch: note.diatonic_pitch(),
            lig: note.lig,
        }
    }
}

/// Duration classes of the rule table. Maxima counts as longa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurClass {
    Longa,
    Brevis,
    Semibrevis,
    Other,
}

impl DurClass {
    fn of(dur: Duration) -> Self {
        match dur {
            Duration::Maxima | Duration::Longa => DurClass::Longa,
            Duration::Brevis => DurClass::Brevis,
            Duration::Semibrevis => DurClass::Semibrevis,
            Duration::Minima | Duration::Semiminima => DurClass::Other,
        }
    }
}

/// Mark `shapes[n1]` oblique. Two consecutive notes cannot both be oblique,
/// so the predecessor loses the flag.
fn set_oblique(shapes: &mut [LigatureShape], n1: usize) {
    shapes[n1] = LigatureShape::OBLIQUE;
    if n1 > 0 {
        shapes[n1 - 1].remove(LigatureShape::OBLIQUE);
    }
}

/// Stage 1: one shape per note. Runs shorter than two notes get no shapes.
///
/// `form` is the form of the ligature itself; obliqua only applies to a two
/// note run. `mensural_black` enables stacking of a final ascending longa.
pub fn compute_shapes(
    notes: &[LigatureNote],
    form: Option<LigatureForm>,
    mensural_black: bool,
) -> Vec<LigatureShape> {
    if notes.len() < 2 {
        return Vec::new();
    }
    let mut shapes = vec![LigatureShape::DEFAULT; notes.len()];
    let last = notes.len() - 1;
    let mut oblique = notes.len() == 2 && form == Some(LigatureForm::Obliqua);
    let mut previous_up = false;

    for n1 in 0..last {
        let n2 = n1 + 1;
        let (first, second) = (&notes[n1], &notes[n2]);

        if first.lig == Some(LigatureForm::Obliqua) {
            oblique = true;
        }
        let is_maxima = first.dur == Duration::Maxima;
        let dur1 = DurClass::of(first.dur);
        let dur2 = DurClass::of(second.dur);

        let diatonic_step = second.diatonic_pitch - first.diatonic_pitch;
        let up = diatonic_step > 0;
        let is_last_note = n2 == last;
        let at_edge = n1 == 0 || is_last_note;

        match (dur1, dur2) {
            (DurClass::Longa, DurClass::Longa) => {
                if up {
                    shapes[n1] = LigatureShape::STEM_RIGHT_DOWN;
                    shapes[n2] = LigatureShape::STEM_RIGHT_DOWN;
                }
            }
            (DurClass::Longa, DurClass::Brevis) => {
                if up {
                    shapes[n1] = LigatureShape::STEM_RIGHT_DOWN;
                } else if !is_maxima && at_edge {
                    // Automatic oblique, never after a maxima.
                    set_oblique(&mut shapes, n1);
                }
            }
            (DurClass::Brevis, DurClass::Brevis) => {
                if !up && at_edge {
                    set_oblique(&mut shapes, n1);
                    if n1 == 0 {
                        shapes[n1].insert(LigatureShape::STEM_LEFT_DOWN);
                    }
                }
            }
            (DurClass::Brevis, DurClass::Longa) => {
                if up {
                    shapes[n2] = LigatureShape::STEM_RIGHT_DOWN;
                } else {
                    if !is_last_note {
                        shapes[n2] = LigatureShape::STEM_RIGHT_DOWN;
                    }
                    if n1 == 0 {
                        shapes[n1] = LigatureShape::STEM_LEFT_DOWN;
                    }
                }
            }
            (DurClass::Semibrevis, DurClass::Semibrevis) => {
                shapes[n1] = LigatureShape::STEM_LEFT_UP;
            }
            (DurClass::Semibrevis, DurClass::Longa) => {
                if up {
                    shapes[n2] = LigatureShape::STEM_RIGHT_DOWN;
                }
            }
            (DurClass::Semibrevis, DurClass::Brevis) => {
                // Leave the oblique to the brevis when it starts one itself.
                if !up && second.lig != Some(LigatureForm::Obliqua) {
                    set_oblique(&mut shapes, n1);
                }
            }
            _ => {}
        }

        // Explicit oblique wins over the table.
        if oblique {
            shapes[n1].insert(LigatureShape::OBLIQUE);
            if n1 > 0 {
                shapes[n1 - 1].remove(LigatureShape::OBLIQUE);
            }
        }

        if is_last_note && mensural_black && dur2 == DurClass::Longa && up {
            let mut threshold = LIGATURE_STACK_THRESHOLD;
            if n1 > 0 && !previous_up {
                // After a descent: from a fourth after an oblique, never after a recta.
                threshold = if shapes[n1 - 1].contains(LigatureShape::OBLIQUE) {
                    LIGATURE_STACK_THRESHOLD_AFTER_OBLIQUE
                } else {
                    i32::MAX
                };
            }
            if diatonic_step > threshold {
                shapes[n2] = LigatureShape::STACKED;
            }
        }

        oblique = false;
        previous_up = up;
    }

    shapes
}

/// Stage 2: x offset of each note from the note widths.
///
/// A stacked note is drawn over its predecessor. A wide oblique interval
/// moves the second note further right so the angle stays readable.
pub fn compute_offsets(notes: &[LigatureNote], shapes: &[LigatureShape], widths: &[i32]) -> Vec<i32> {
    let mut offsets = Vec::with_capacity(notes.len());
    let mut previous_right = 0;

    for (i, note) in notes.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or_default();
        let shape = shapes.get(i).copied().unwrap_or_default();
        if shape.contains(LigatureShape::STACKED) {
            previous_right -= width;
        }
        let mut x = previous_right;
        previous_right += width;

        if i > 0 {
            let diatonic_step = note.diatonic_pitch - notes[i - 1].diatonic_pitch;
            let previous_shape = shapes.get(i - 1).copied().unwrap_or_default();
            if previous_shape.contains(LigatureShape::OBLIQUE)
                && diatonic_step.abs() > LIGATURE_OBLIQUE_MAX_STEP
            {
                // The angle stays the same from a third onward.
                let shift = (diatonic_step.abs() - LIGATURE_OBLIQUE_MAX_STEP) * width * 2 / 3;
                x += shift;
                previous_right += shift;
            }
        }
        offsets.push(x);
    }

    offsets
}

// ═══════════════════════════════════════════════════════════════════════
// Pass
// ═══════════════════════════════════════════════════════════════════════

pub struct CalcLigatureNotePos<'a> {
    metrics: &'a dyn GlyphMetrics,
    as_bracket: bool,
    ligatures: usize,
}

impl<'a> CalcLigatureNotePos<'a> {
    pub fn new(metrics: &'a dyn GlyphMetrics, as_bracket: bool) -> Self {
        Self {
            metrics,
            as_bracket,
            ligatures: 0,
        }
    }

    /// Ligatures laid out so far.
    pub fn ligatures(&self) -> usize {
        self.ligatures
    }

    fn visit_ligature(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        if let Some(ligature) = doc.get_mut(id).and_then(|e| e.ligature_mut()) {
            ligature.drawing_shapes.clear();
        }

        let note_ids = doc.list(id);
        if note_ids.len() < 2 {
            return FunctorCode::Siblings;
        }

        let (notation_type, staff_size) = doc
            .first_ancestor(id, ElementKind::Staff)
            .and_then(|s| doc.get(s))
            .and_then(|s| s.staff())
            .map_or((NotationType::default(), DEFAULT_STAFF_SIZE), |s| {
                (s.notation_type, s.staff_size)
            });
        let form = doc.get(id).and_then(|e| e.ligature()).and_then(|l| l.form);

        let mut notes = Vec::with_capacity(note_ids.len());
        let mut widths = Vec::with_capacity(note_ids.len());
        for &note_id in &note_ids {
            let Some(note) = doc.get(note_id).and_then(|e| e.note()) else {
                continue;
            };
            notes.push(LigatureNote::from(note));
            widths.push(
                self.metrics.note_radius(note, staff_size) * 2 - self.metrics.stem_width(staff_size),
            );
        }

        let shapes = compute_shapes(&notes, form, notation_type == NotationType::MensuralBlack);
        let offsets = compute_offsets(&notes, &shapes, &widths);

        for (&note_id, &x) in note_ids.iter().zip(&offsets) {
            if let Some(note) = doc.get_mut(note_id).and_then(|e| e.note_mut()) {
                note.drawing_x_rel = x;
            }
        }
        if let Some(ligature) = doc.get_mut(id).and_then(|e| e.ligature_mut()) {
            ligature.drawing_shapes = shapes;
        }
        self.ligatures += 1;
        FunctorCode::Siblings
    }
}

impl Functor for CalcLigatureNotePos<'_> {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        match doc.kind(id) {
            Some(ElementKind::Ligature) if !self.as_bracket => self.visit_ligature(doc, id),
            Some(_) => FunctorCode::Continue,
            None => FunctorCode::Siblings,
        }
    }
}

/// Lay out every ligature of the document. Returns the number of ligatures
/// with computed shapes.
pub fn calc_ligature_note_pos(doc: &mut Document, metrics: &dyn GlyphMetrics) -> usize {
    let mut functor = CalcLigatureNotePos::new(metrics, doc.options.ligature_as_bracket);
    doc.process(&mut functor);
    functor.ligatures()
}

impl Document {
    /// Shape computed for `note` in `ligature`, `None` when the note is not
    /// part of the run or shapes were not computed.
    pub fn drawing_note_shape(&mut self, ligature: ElementId, note: ElementId) -> Option<LigatureShape> {
        let position = self.list_index(ligature, note)?;
        self.get(ligature)?
            .ligature()?
            .drawing_shapes()
            .get(position)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Pname;
    use pretty_assertions::assert_eq;

    fn run(notes: &[(Duration, Pname, i32)]) -> Vec<LigatureNote> {
        notes
            .iter()
            .map(|&(dur, pname, oct)| LigatureNote::from(&NoteData::new(pname, oct, dur)))
            .collect()
    }

    const D: LigatureShape = LigatureShape::DEFAULT;

    #[test]
    fn ascending_longae_both_stem_right_down() {
        let notes = run(&[(Duration::Longa, Pname::C, 4), (Duration::Longa, Pname::G, 4)]);
        let shapes = compute_shapes(&notes, None, false);
        assert_eq!(
            shapes,
            vec![LigatureShape::STEM_RIGHT_DOWN, LigatureShape::STEM_RIGHT_DOWN]
        );
    }

    #[test]
    fn ascending_breves_keep_default() {
        let notes = run(&[(Duration::Brevis, Pname::C, 4), (Duration::Brevis, Pname::E, 4)]);
        assert_eq!(compute_shapes(&notes, None, false), vec![D, D]);
    }

    #[test]
    fn descending_breves_start_oblique_with_left_stem() {
        let notes = run(&[(Duration::Brevis, Pname::E, 4), (Duration::Brevis, Pname::C, 4)]);
        assert_eq!(
            compute_shapes(&notes, None, false),
            vec![LigatureShape::OBLIQUE | LigatureShape::STEM_LEFT_DOWN, D]
        );
    }

    #[test]
    fn oblique_is_never_on_two_consecutive_notes() {
        // Descending B-B-B: the last pair takes the oblique from the first.
        let notes = run(&[
            (Duration::Brevis, Pname::G, 4),
            (Duration::Brevis, Pname::E, 4),
            (Duration::Brevis, Pname::C, 4),
        ]);
        let shapes = compute_shapes(&notes, None, false);
        assert_eq!(
            shapes,
            vec![LigatureShape::STEM_LEFT_DOWN, LigatureShape::OBLIQUE, D]
        );
    }

    #[test]
    fn maxima_suppresses_automatic_oblique() {
        let notes = run(&[(Duration::Maxima, Pname::G, 4), (Duration::Brevis, Pname::C, 4)]);
        assert_eq!(compute_shapes(&notes, None, false), vec![D, D]);
        let notes = run(&[(Duration::Longa, Pname::G, 4), (Duration::Brevis, Pname::C, 4)]);
        assert_eq!(compute_shapes(&notes, None, false), vec![LigatureShape::OBLIQUE, D]);
    }

    #[test]
    fn brevis_longa_descending() {
        let notes = run(&[
            (Duration::Brevis, Pname::G, 4),
            (Duration::Longa, Pname::E, 4),
            (Duration::Longa, Pname::C, 4),
        ]);
        assert_eq!(
            compute_shapes(&notes, None, false),
            vec![LigatureShape::STEM_LEFT_DOWN, LigatureShape::STEM_RIGHT_DOWN, D]
        );
    }

    #[test]
    fn semibreves_get_left_stem_up() {
        let notes = run(&[
            (Duration::Semibrevis, Pname::C, 4),
            (Duration::Semibrevis, Pname::D, 4),
        ]);
        assert_eq!(
            compute_shapes(&notes, None, false),
            vec![LigatureShape::STEM_LEFT_UP, D]
        );
    }

    #[test]
    fn explicit_oblique_forces_first_of_pair() {
        let mut notes = run(&[(Duration::Brevis, Pname::C, 4), (Duration::Brevis, Pname::E, 4)]);
        assert_eq!(
            compute_shapes(&notes, Some(LigatureForm::Obliqua), false),
            vec![LigatureShape::OBLIQUE, D]
        );
        notes[0].lig = Some(LigatureForm::Obliqua);
        assert_eq!(compute_shapes(&notes, None, false), vec![LigatureShape::OBLIQUE, D]);
    }

    #[test]
    fn black_notation_stacks_final_ascending_longa() {
        let notes = run(&[(Duration::Brevis, Pname::C, 4), (Duration::Longa, Pname::E, 4)]);
        assert_eq!(
            compute_shapes(&notes, None, true),
            vec![D, LigatureShape::STACKED]
        );
        // A second only is not enough.
        let notes = run(&[(Duration::Brevis, Pname::C, 4), (Duration::Longa, Pname::D, 4)]);
        assert_eq!(
            compute_shapes(&notes, None, true),
            vec![D, LigatureShape::STEM_RIGHT_DOWN]
        );
    }

    #[test]
    fn semibrevis_longa_ascending() {
        let notes = run(&[(Duration::Semibrevis, Pname::C, 4), (Duration::Longa, Pname::E, 4)]);
        assert_eq!(
            compute_shapes(&notes, None, false),
            vec![D, LigatureShape::STEM_RIGHT_DOWN]
        );
        let notes = run(&[(Duration::Semibrevis, Pname::E, 4), (Duration::Longa, Pname::C, 4)]);
        assert_eq!(compute_shapes(&notes, None, false), vec![D, D]);
    }

    #[test]
    fn semibrevis_brevis_descending_is_oblique() {
        let notes = run(&[(Duration::Semibrevis, Pname::E, 4), (Duration::Brevis, Pname::C, 4)]);
        assert_eq!(compute_shapes(&notes, None, false), vec![LigatureShape::OBLIQUE, D]);
    }

    #[test]
    fn semibrevis_leaves_oblique_to_a_brevis_starting_one() {
        let mut notes = run(&[
            (Duration::Semibrevis, Pname::E, 4),
            (Duration::Brevis, Pname::C, 4),
            (Duration::Brevis, Pname::A, 3),
        ]);
        notes[1].lig = Some(LigatureForm::Obliqua);
        assert_eq!(
            compute_shapes(&notes, None, false),
            vec![D, LigatureShape::OBLIQUE, D]
        );
    }

    #[test]
    fn last_longa_brevis_takes_oblique_from_predecessor() {
        let mut notes = run(&[
            (Duration::Brevis, Pname::A, 4),
            (Duration::Longa, Pname::F, 4),
            (Duration::Brevis, Pname::D, 4),
        ]);
        notes[0].lig = Some(LigatureForm::Obliqua);
        assert_eq!(
            compute_shapes(&notes, None, false),
            vec![LigatureShape::STEM_LEFT_DOWN, LigatureShape::OBLIQUE, D]
        );
    }

    #[test]
    fn stacking_after_oblique_descent_needs_a_fourth() {
        let notes = run(&[
            (Duration::Brevis, Pname::G, 4),
            (Duration::Brevis, Pname::E, 4),
            (Duration::Longa, Pname::A, 4),
        ]);
        assert_eq!(
            compute_shapes(&notes, None, true),
            vec![
                LigatureShape::OBLIQUE | LigatureShape::STEM_LEFT_DOWN,
                D,
                LigatureShape::STACKED
            ]
        );
        // A third is not enough after an oblique.
        let notes = run(&[
            (Duration::Brevis, Pname::G, 4),
            (Duration::Brevis, Pname::E, 4),
            (Duration::Longa, Pname::G, 4),
        ]);
        assert_eq!(
            compute_shapes(&notes, None, true),
            vec![
                LigatureShape::OBLIQUE | LigatureShape::STEM_LEFT_DOWN,
                D,
                LigatureShape::STEM_RIGHT_DOWN
            ]
        );
    }

    #[test]
    fn no_stacking_after_recta_descent() {
        // Up a sixth, still not stacked.
        let notes = run(&[
            (Duration::Longa, Pname::G, 4),
            (Duration::Longa, Pname::E, 4),
            (Duration::Longa, Pname::C, 5),
        ]);
        assert_eq!(
            compute_shapes(&notes, None, true),
            vec![D, LigatureShape::STEM_RIGHT_DOWN, LigatureShape::STEM_RIGHT_DOWN]
        );
    }

    #[test]
    fn short_runs_get_no_shapes() {
        let notes = run(&[(Duration::Brevis, Pname::C, 4)]);
        assert!(compute_shapes(&notes, None, false).is_empty());
        assert!(compute_shapes(&[], None, false).is_empty());
    }

    #[test]
    fn offsets_follow_widths() {
        let notes = run(&[(Duration::Brevis, Pname::C, 4), (Duration::Brevis, Pname::E, 4)]);
        let shapes = compute_shapes(&notes, None, false);
        assert_eq!(compute_offsets(&notes, &shapes, &[162, 162]), vec![0, 162]);
    }

    #[test]
    fn stacked_note_backtracks() {
        let notes = run(&[(Duration::Brevis, Pname::C, 4), (Duration::Longa, Pname::E, 4)]);
        let shapes = vec![D, LigatureShape::STACKED];
        assert_eq!(compute_offsets(&notes, &shapes, &[162, 162]), vec![0, 0]);
    }

    #[test]
    fn wide_oblique_shifts_following_notes() {
        // A fifth down: three steps past the limit of two.
        let notes = run(&[
            (Duration::Brevis, Pname::G, 4),
            (Duration::Brevis, Pname::C, 4),
            (Duration::Longa, Pname::D, 4),
        ]);
        let shapes = vec![LigatureShape::OBLIQUE, D, D];
        let offsets = compute_offsets(&notes, &shapes, &[150, 150, 150]);
        assert_eq!(offsets, vec![0, 150 + 2 * 150 * 2 / 3, 300 + 200]);
    }
}
