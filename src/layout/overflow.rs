//! Right-overflow detection for directives, dynamics and tempo marks.
//!
//! Per system, the positioner reaching furthest right is kept; its right
//! edge becomes the width the system needs.

use crate::aligner::FloatingPositioner;
use crate::document::Document;
use crate::functor::{Functor, FunctorCode};
use crate::model::{ElementId, ElementKind, HorizontalAlignment};

/// Widest positioner found in one system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemOverflow {
    pub system: ElementId,
    pub widest: FloatingPositioner,
}

#[derive(Debug, Default)]
pub struct AdjustXOverflow {
    current_system: Option<ElementId>,
    current_widest: Option<FloatingPositioner>,
    overflows: Vec<SystemOverflow>,
}

impl AdjustXOverflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widest positioner of the system being traversed.
    pub fn current_widest(&self) -> Option<&FloatingPositioner> {
        self.current_widest.as_ref()
    }

    /// One entry per system that has at least one eligible positioner.
    pub fn overflows(&self) -> &[SystemOverflow] {
        &self.overflows
    }

    fn visit_control(&mut self, doc: &mut Document, id: ElementId, kind: ElementKind) -> FunctorCode {
        // Only these can currently extend past the right edge.
        if !matches!(kind, ElementKind::Dir | ElementKind::Dynam | ElementKind::Tempo) {
            return FunctorCode::Siblings;
        }

        // Right aligned content cannot overflow.
        if doc.child_rend_alignment(id) == Some(HorizontalAlignment::Right) {
            return FunctorCode::Siblings;
        }

        let Some(system) = self.current_system else {
            log::debug!("{kind} {id:?} visited outside of a system");
            return FunctorCode::Siblings;
        };

        // All staves, since they can have different sizes.
        let positioners = doc
            .get(system)
            .and_then(|s| s.system())
            .map(|s| s.aligner.find_all_positioners_pointing_to(id))
            .unwrap_or_default();

        // Probably no @staff on the element.
        if positioners.is_empty() {
            log::debug!(
                "Something was wrong when searching positioners for {kind} '{}'",
                doc.get(id).and_then(|e| e.xml_id.as_deref()).unwrap_or_default()
            );
            return FunctorCode::Siblings;
        }

        for positioner in positioners {
            let wider = match &self.current_widest {
                Some(widest) => widest.content_right() < positioner.content_right(),
                None => true,
            };
            if wider {
                self.current_widest = Some(positioner);
            }
        }

        FunctorCode::Continue
    }
}

impl Functor for AdjustXOverflow {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        let Some(kind) = doc.kind(id) else {
            return FunctorCode::Siblings;
        };
        match kind {
            ElementKind::System => {
                self.current_system = Some(id);
                self.current_widest = None;
                FunctorCode::Continue
            }
            ElementKind::Root | ElementKind::Measure => FunctorCode::Continue,
            k if k.is_editorial() => FunctorCode::Continue,
            k if k.is_control_element() => self.visit_control(doc, id, k),
            _ => FunctorCode::Siblings,
        }
    }

    fn visit_end(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        if doc.kind(id) != Some(ElementKind::System) {
            return FunctorCode::Continue;
        }
        if let Some(widest) = self.current_widest {
            if let Some(system) = doc.get_mut(id).and_then(|s| s.system_mut()) {
                system.required_width = Some(widest.content_right());
            }
            self.overflows.push(SystemOverflow { system: id, widest });
        }
        self.current_system = None;
        FunctorCode::Continue
    }
}

/// Run the overflow pass over the whole document.
pub fn adjust_x_overflow(doc: &mut Document) -> Vec<SystemOverflow> {
    let mut functor = AdjustXOverflow::new();
    doc.process(&mut functor);
    functor.overflows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::BoundingBox;
    use crate::model::{Element, NotationType};

    struct Fixture {
        doc: Document,
        system: ElementId,
        measure: ElementId,
    }

    fn fixture() -> Fixture {
        let mut doc = Document::default();
        let system = doc.add_child(doc.root(), Element::new_system(1000)).unwrap();
        let measure = doc.add_child(system, Element::new_measure(&[0, 1000])).unwrap();
        let staff = doc
            .add_child(measure, Element::new_staff(1, NotationType::Cmn))
            .unwrap();
        doc.add_child(staff, Element::new_layer(1)).unwrap();
        Fixture {
            doc,
            system,
            measure,
        }
    }

    fn measured(f: &mut Fixture, element: Element, rights: &[i32]) -> ElementId {
        let id = f.doc.add_child(f.measure, element).unwrap();
        let system = f.system;
        let aligner = &mut f.doc.get_mut(system).unwrap().system_mut().unwrap().aligner;
        for (i, &right) in rights.iter().enumerate() {
            aligner.add_positioner(FloatingPositioner {
                system,
                staff_n: i as i32 + 1,
                element: id,
                bbox: BoundingBox::new(right - 100, right, 0, 50),
                has_content: true,
            });
        }
        id
    }

    #[test]
    fn keeps_rightmost_positioner() {
        let mut f = fixture();
        measured(&mut f, Element::new(ElementKind::Dynam), &[900, 1050]);
        let tempo = measured(&mut f, Element::new(ElementKind::Tempo), &[1200]);
        measured(&mut f, Element::new(ElementKind::Dir), &[1100]);

        let overflows = adjust_x_overflow(&mut f.doc);
        assert_eq!(overflows.len(), 1);
        assert_eq!(overflows[0].widest.element, tempo);
        let system = f.doc.get(f.system).unwrap().system().unwrap();
        assert_eq!(system.required_width(), Some(1200));
    }

    #[test]
    fn first_seen_wins_ties() {
        let mut f = fixture();
        let first = measured(&mut f, Element::new(ElementKind::Dir), &[1100]);
        measured(&mut f, Element::new(ElementKind::Dynam), &[1100]);
        let overflows = adjust_x_overflow(&mut f.doc);
        assert_eq!(overflows[0].widest.element, first);
    }

    #[test]
    fn right_aligned_and_other_kinds_are_ignored() {
        let mut f = fixture();
        let plain = measured(&mut f, Element::new(ElementKind::Dir), &[1000]);
        let aligned = measured(&mut f, Element::new(ElementKind::Dir), &[5000]);
        f.doc
            .add_child(aligned, Element::new_rend(Some(HorizontalAlignment::Right)))
            .unwrap();
        measured(&mut f, Element::new(ElementKind::Harm), &[6000]);

        let overflows = adjust_x_overflow(&mut f.doc);
        assert_eq!(overflows[0].widest.element, plain);
    }

    #[test]
    fn missing_positioners_are_skipped() {
        let mut f = fixture();
        f.doc
            .add_child(f.measure, Element::new(ElementKind::Dynam))
            .unwrap();
        assert!(adjust_x_overflow(&mut f.doc).is_empty());
        let system = f.doc.get(f.system).unwrap().system().unwrap();
        assert_eq!(system.required_width(), None);
    }
}
