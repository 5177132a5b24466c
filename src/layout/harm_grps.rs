//! Grouping of harmony labels into continuous lines and the horizontal
//! spacing that keeps the labels of one group from colliding.

use std::collections::HashMap;

use super::constants::*;
use super::metrics::GlyphMetrics;
use crate::aligner::{AlignmentAdjustment, FloatingPositioner};
use crate::document::Document;
use crate::functor::{Functor, FunctorCode};
use crate::model::{ElementId, ElementKind};
use crate::options::LayoutOptions;

// ═══════════════════════════════════════════════════════════════════════
// Grouping
// ═══════════════════════════════════════════════════════════════════════

/// Assigns a drawing group id to every harmony label. Labels share a group
/// when they share `@n`; labels without `@n` are grouped by their first
/// staff, keyed by the negated staff number so they never meet an explicit
/// group number.
#[derive(Debug, Default)]
pub struct PrepareFloatingGrps {
    /// Grouping key -> first label seen with that key.
    harms: HashMap<String, ElementId>,
    last_grp_id: i32,
}

impl PrepareFloatingGrps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grouping key of a harmony label. With several staves only the first
    /// one counts.
    pub fn grouping_key(n: Option<&str>, staff: &[i32]) -> String {
        match n.filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => staff.first().map(|s| (-s).to_string()).unwrap_or_default(),
        }
    }
}

impl Functor for PrepareFloatingGrps {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        if doc.kind(id) != Some(ElementKind::Harm) {
            return FunctorCode::Continue;
        }
        let Some(control) = doc.get(id).and_then(|e| e.control()) else {
            return FunctorCode::Continue;
        };
        let key = Self::grouping_key(control.n.as_deref(), control.staff());

        let grp_id = match self.harms.get(&key) {
            Some(&representative) => doc
                .get(representative)
                .and_then(|e| e.control())
                .map_or(0, |c| c.drawing_grp_id),
            None => {
                // First label with this key starts a new group.
                self.last_grp_id += 1;
                self.harms.insert(key, id);
                self.last_grp_id
            }
        };
        if let Some(control) = doc.get_mut(id).and_then(|e| e.control_mut()) {
            control.drawing_grp_id = grp_id;
        }
        FunctorCode::Continue
    }
}

pub fn prepare_floating_grps(doc: &mut Document) {
    doc.process(&mut PrepareFloatingGrps::new());
}

// ═══════════════════════════════════════════════════════════════════════
// Spacing
// ═══════════════════════════════════════════════════════════════════════

/// Widens the alignment grid wherever two consecutive labels of a group
/// overlap.
///
/// Each system is first walked to collect its group ids, then once more
/// per group id, since the previous-label state must not mix groups.
#[derive(Debug)]
pub struct AdjustHarmGrpsSpacing {
    word_space: i32,
    current_system: Option<ElementId>,
    grp_ids: Vec<i32>,
    /// 0 while collecting group ids.
    current_grp: i32,
    previous_harm_start: Option<ElementId>,
    previous_harm_positioner: Option<FloatingPositioner>,
    /// Last measure ended since the previous label.
    previous_measure: Option<ElementId>,
    overlapping_harm: Vec<AlignmentAdjustment>,
    requests: usize,
}

impl AdjustHarmGrpsSpacing {
    pub fn new(options: &LayoutOptions, metrics: &dyn GlyphMetrics) -> Self {
        let word_space = HARM_WORD_SPACE_UNITS * metrics.drawing_unit(DEFAULT_STAFF_SIZE);
        Self {
            word_space: (word_space as f64 * options.lyric_size_ratio()) as i32,
            current_system: None,
            grp_ids: Vec::new(),
            current_grp: 0,
            previous_harm_start: None,
            previous_harm_positioner: None,
            previous_measure: None,
            overlapping_harm: Vec::new(),
            requests: 0,
        }
    }

    /// Number of redistribution requests issued so far.
    pub fn requests(&self) -> usize {
        self.requests
    }

    fn reset_previous(&mut self) {
        self.previous_harm_start = None;
        self.previous_harm_positioner = None;
        self.previous_measure = None;
        self.overlapping_harm.clear();
    }

    fn visit_system(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        self.current_system = Some(id);
        self.grp_ids.clear();
        self.current_grp = 0;
        self.reset_previous();

        // Collect the group ids present in the system.
        doc.process_children(id, self);

        for grp_id in self.grp_ids.clone() {
            self.current_grp = grp_id;
            self.reset_previous();
            doc.process_children(id, self);
        }

        self.current_grp = 0;
        self.current_system = None;
        FunctorCode::Siblings
    }

    fn visit_harm(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        let Some(control) = doc.get(id).and_then(|e| e.control()) else {
            return FunctorCode::Siblings;
        };
        let grp_id = control.drawing_grp_id;
        let start = control.start();

        // No group id, nothing to do.
        if grp_id == 0 {
            return FunctorCode::Siblings;
        }

        if self.current_grp == 0 {
            if !self.grp_ids.contains(&grp_id) {
                self.grp_ids.push(grp_id);
            }
            return FunctorCode::Siblings;
        }
        if grp_id != self.current_grp {
            return FunctorCode::Siblings;
        }

        // ── Leftmost positioner, which is also the widest ───────────────
        let positioners = self
            .current_system
            .and_then(|s| doc.get(s))
            .and_then(|s| s.system())
            .map(|s| s.aligner.find_all_positioners_pointing_to(id))
            .unwrap_or_default();
        let mut harm_positioner: Option<FloatingPositioner> = None;
        for positioner in positioners {
            let further_left = match &harm_positioner {
                Some(current) => current.content_left() > positioner.content_left(),
                None => true,
            };
            if further_left {
                harm_positioner = Some(positioner);
            }
        }
        let Some(harm_positioner) = harm_positioner else {
            log::debug!(
                "Something was wrong when searching positioners for harm '{}'",
                doc.get(id).and_then(|e| e.xml_id.as_deref()).unwrap_or_default()
            );
            return FunctorCode::Siblings;
        };
        if !harm_positioner.has_content {
            return FunctorCode::Siblings;
        }
        let Some(start) = start else {
            log::debug!("harm {id:?} has no resolved start, spacing skipped");
            return FunctorCode::Siblings;
        };

        // ── Overlap with the previous label of the group ────────────────
        let Some(previous_positioner) = self.previous_harm_positioner else {
            self.previous_harm_start = Some(start);
            self.previous_harm_positioner = Some(harm_positioner);
            self.previous_measure = None;
            return FunctorCode::Siblings;
        };

        // Measures are not aligned yet: project the previous label into this
        // measure by adding the width of the measure it was in.
        let x_shift = self
            .previous_measure
            .and_then(|m| doc.get(m))
            .and_then(|m| m.measure())
            .map_or(0, |m| m.width());

        let mut overlap =
            previous_positioner.content_right() - (harm_positioner.content_left() + x_shift);
        overlap += self.word_space;

        if overlap > 0 {
            self.request_space(doc, start, overlap);
        }

        self.previous_harm_start = Some(start);
        self.previous_harm_positioner = Some(harm_positioner);
        self.previous_measure = None;
        FunctorCode::Siblings
    }

    fn request_space(&mut self, doc: &mut Document, start: ElementId, overlap: i32) {
        let Some(previous_alignment) = self.previous_harm_start.and_then(|s| note_alignment(doc, s))
        else {
            log::debug!("previous harm start has no alignment, spacing skipped");
            return;
        };

        match self.previous_measure {
            // Labels in two measures: only move the right barline of the
            // first one, and do it now since its width is read again.
            Some(measure_id) => {
                let Some(measure) = doc.get_mut(measure_id).and_then(|m| m.measure_mut()) else {
                    return;
                };
                let Some(barline) = measure.aligner.right_barline() else {
                    log::debug!("measure {measure_id:?} has no right barline alignment");
                    return;
                };
                self.overlapping_harm.push(AlignmentAdjustment {
                    start: previous_alignment,
                    end: barline,
                    dist: overlap,
                });
                measure.aligner.adjust_proportionally(&self.overlapping_harm);
                self.overlapping_harm.clear();
                self.requests += 1;
            }
            None => {
                let Some(alignment) = note_alignment(doc, start) else {
                    log::debug!("harm start {start:?} has no alignment, spacing skipped");
                    return;
                };
                self.overlapping_harm.push(AlignmentAdjustment {
                    start: previous_alignment,
                    end: alignment,
                    dist: overlap,
                });
                self.requests += 1;
            }
        }
    }
}

fn note_alignment(doc: &Document, id: ElementId) -> Option<usize> {
    doc.get(id)?.note()?.alignment
}

impl Functor for AdjustHarmGrpsSpacing {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        let Some(kind) = doc.kind(id) else {
            return FunctorCode::Siblings;
        };
        match kind {
            ElementKind::System => self.visit_system(doc, id),
            ElementKind::Harm => self.visit_harm(doc, id),
            ElementKind::Root | ElementKind::Measure => FunctorCode::Continue,
            k if k.is_editorial() => FunctorCode::Continue,
            _ => FunctorCode::Siblings,
        }
    }

    fn visit_end(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        if doc.kind(id) != Some(ElementKind::Measure) || self.current_grp == 0 {
            return FunctorCode::Continue;
        }
        self.previous_measure = Some(id);
        if !self.overlapping_harm.is_empty() {
            if let Some(measure) = doc.get_mut(id).and_then(|m| m.measure_mut()) {
                measure.aligner.adjust_proportionally(&self.overlapping_harm);
            }
            self.overlapping_harm.clear();
        }
        FunctorCode::Continue
    }
}

/// Run the spacing pass; returns the number of redistribution requests.
pub fn adjust_harm_grps_spacing(doc: &mut Document, metrics: &dyn GlyphMetrics) -> usize {
    let options = doc.options.clone();
    let mut functor = AdjustHarmGrpsSpacing::new(&options, metrics);
    doc.process(&mut functor);
    functor.requests()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_key_prefers_n() {
        assert_eq!(PrepareFloatingGrps::grouping_key(Some("2"), &[3]), "2");
        assert_eq!(PrepareFloatingGrps::grouping_key(None, &[3, 4]), "-3");
        assert_eq!(PrepareFloatingGrps::grouping_key(Some(""), &[4]), "-4");
        assert_eq!(PrepareFloatingGrps::grouping_key(None, &[]), "");
    }
}
