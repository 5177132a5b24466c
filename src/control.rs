//! Queries shared by control elements.

use crate::document::Document;
use crate::model::{ElementId, ElementKind, HorizontalAlignment, StaffRel, StemDirection};

impl Document {
    /// Horizontal alignment of the first rend below a control element.
    pub fn child_rend_alignment(&self, id: ElementId) -> Option<HorizontalAlignment> {
        let rend = self.find_descendant_by_kind(id, ElementKind::Rend, None)?;
        self.get(rend)?.rend()?.halign
    }

    /// Placement of an ornament following the stem of the note it starts on:
    /// above for stems up, below for stems down. Other kinds, and ornaments
    /// without a resolved start, get `default`.
    pub fn layer_place(&self, id: ElementId, default: StaffRel) -> StaffRel {
        if !matches!(
            self.kind(id),
            Some(ElementKind::Trill | ElementKind::Mordent | ElementKind::Turn)
        ) {
            return default;
        }
        let Some(start) = self
            .get(id)
            .and_then(|e| e.control())
            .and_then(|c| c.start())
        else {
            return default;
        };

        let note_dir = self
            .get(start)
            .and_then(|e| e.note())
            .and_then(|n| n.stem_dir);
        let layer_dir = self
            .first_ancestor(start, ElementKind::Layer)
            .and_then(|l| self.get(l))
            .and_then(|l| l.layer())
            .and_then(|l| l.drawing_stem_dir);

        match note_dir.or(layer_dir) {
            Some(StemDirection::Up) => StaffRel::Above,
            Some(StemDirection::Down) => StaffRel::Below,
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Duration, Element, NotationType, Pname};

    #[test]
    fn rend_alignment_of_nested_rend() {
        let mut doc = Document::default();
        let system = doc.add_child(doc.root(), Element::new_system(1000)).unwrap();
        let measure = doc.add_child(system, Element::new_measure(&[0, 100])).unwrap();
        let dir = doc.add_child(measure, Element::new(ElementKind::Dir)).unwrap();
        assert_eq!(doc.child_rend_alignment(dir), None);
        let outer = doc.add_child(dir, Element::new_rend(None)).unwrap();
        doc.add_child(outer, Element::new_rend(Some(HorizontalAlignment::Right)))
            .unwrap();
        // The first rend wins even without an alignment of its own.
        assert_eq!(doc.child_rend_alignment(dir), None);
    }

    #[test]
    fn ornament_follows_stem() {
        let mut doc = Document::default();
        let system = doc.add_child(doc.root(), Element::new_system(1000)).unwrap();
        let measure = doc.add_child(system, Element::new_measure(&[0, 100])).unwrap();
        let staff = doc
            .add_child(measure, Element::new_staff(1, NotationType::Cmn))
            .unwrap();
        let layer = doc.add_child(staff, Element::new_layer(1)).unwrap();
        let note = doc
            .add_child(
                layer,
                Element::new_note(Pname::A, 4, Duration::Minima).with_stem_dir(StemDirection::Down),
            )
            .unwrap();
        let trill = doc.add_child(measure, Element::new(ElementKind::Trill)).unwrap();
        assert_eq!(doc.layer_place(trill, StaffRel::Above), StaffRel::Above);

        let time = doc
            .get_mut(trill)
            .and_then(|e| e.control_mut())
            .and_then(|c| c.time.as_mut())
            .unwrap();
        time.start = Some(note);
        assert_eq!(doc.layer_place(trill, StaffRel::Above), StaffRel::Below);

        let dynam = doc.add_child(measure, Element::new(ElementKind::Dynam)).unwrap();
        assert_eq!(doc.layer_place(dynam, StaffRel::Below), StaffRel::Below);
    }
}
