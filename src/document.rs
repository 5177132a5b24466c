//! Arena owning the element tree.
//!
//! Elements are addressed by [`ElementId`] handles. The owning direction is
//! always parent to child; the parent link stored on each element is a plain
//! handle.

use crate::error::{LayoutError, Result};
use crate::model::{Element, ElementId, ElementKind};
use crate::options::LayoutOptions;

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    root: ElementId,
    pub options: LayoutOptions,
}

impl Document {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            nodes: vec![Element::new(ElementKind::Root)],
            root: ElementId(0),
            options,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0)
    }

    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.get(id).map(Element::kind)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(Element::parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map(Element::children).unwrap_or(&[])
    }

    /// Append `element` as the last child of `parent`.
    ///
    /// Fails without touching the tree when the parent kind does not accept
    /// the child kind.
    pub fn add_child(&mut self, parent: ElementId, mut element: Element) -> Result<ElementId> {
        let parent_kind = self.kind(parent).ok_or(LayoutError::UnknownElement(parent))?;
        if !parent_kind.supports_child(element.kind()) {
            log::debug!("Adding '{}' to a '{}' rejected", element.kind(), parent_kind);
            return Err(LayoutError::UnsupportedChild {
                parent: parent_kind,
                child: element.kind(),
            });
        }

        let id = ElementId(self.nodes.len());
        element.parent = Some(parent);
        element.children.clear();
        self.nodes.push(element);
        self.nodes[parent.0].children.push(id);
        self.modify(parent);
        Ok(id)
    }

    /// Invalidate cached views on `id` and its ancestors after a structural
    /// change.
    pub fn modify(&mut self, id: ElementId) {
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(element) = self.get_mut(id) else {
                break;
            };
            if let Some(ligature) = element.ligature_mut() {
                ligature.list = None;
            }
            current = element.parent();
        }
    }

    pub fn first_ancestor(&self, id: ElementId, kind: ElementKind) -> Option<ElementId> {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if self.kind(ancestor) == Some(kind) {
                return Some(ancestor);
            }
            current = self.parent(ancestor);
        }
        None
    }

    /// First descendant of `kind` in document order, searching at most
    /// `max_depth` levels below `id` (1 = children only).
    pub fn find_descendant_by_kind(
        &self,
        id: ElementId,
        kind: ElementKind,
        max_depth: Option<usize>,
    ) -> Option<ElementId> {
        if max_depth == Some(0) {
            return None;
        }
        let next_depth = max_depth.map(|d| d - 1);
        for &child in self.children(id) {
            if self.kind(child) == Some(kind) {
                return Some(child);
            }
            if let Some(found) = self.find_descendant_by_kind(child, kind, next_depth) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants of `kind` in document order.
    pub fn find_all_descendants_by_kind(&self, id: ElementId, kind: ElementKind) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.collect_descendants(id, &mut |doc, child| doc.kind(child) == Some(kind), &mut found);
        found
    }

    fn collect_descendants(
        &self,
        id: ElementId,
        filter: &mut dyn FnMut(&Document, ElementId) -> bool,
        found: &mut Vec<ElementId>,
    ) {
        for &child in self.children(id) {
            if filter(self, child) {
                found.push(child);
            }
            self.collect_descendants(child, filter, found);
        }
    }

    pub fn find_by_xml_id(&self, xml_id: &str) -> Option<ElementId> {
        let mut found = Vec::new();
        self.collect_descendants(
            self.root,
            &mut |doc, child| {
                doc.get(child)
                    .and_then(|e| e.xml_id.as_deref())
                    .is_some_and(|id| id == xml_id)
            },
            &mut found,
        );
        found.first().copied()
    }

    /// Concatenated content of all text descendants.
    pub fn text_content(&self, id: ElementId) -> String {
        self.find_all_descendants_by_kind(id, ElementKind::Text)
            .into_iter()
            .filter_map(|t| self.get(t).and_then(Element::text))
            .map(|t| t.text.as_str())
            .collect()
    }

    /// Note view of a ligature: note descendants in document order, with
    /// dots and editorial wrappers filtered out. Built on first use and kept
    /// until the next structural change.
    pub fn list(&mut self, id: ElementId) -> Vec<ElementId> {
        if let Some(list) = self.get(id).and_then(Element::ligature).and_then(|l| l.list.clone()) {
            return list;
        }
        let notes = self.find_all_descendants_by_kind(id, ElementKind::Note);
        if let Some(ligature) = self.get_mut(id).and_then(Element::ligature_mut) {
            ligature.list = Some(notes.clone());
        }
        notes
    }

    /// Position of `element` in the list view of `id`.
    pub fn list_index(&mut self, id: ElementId, element: ElementId) -> Option<usize> {
        self.list(id).iter().position(|&e| e == element)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(LayoutOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Duration, NotationType, Pname};

    fn ligature_doc() -> (Document, ElementId, ElementId) {
        let mut doc = Document::default();
        let system = doc.add_child(doc.root(), Element::new_system(1000)).unwrap();
        let measure = doc.add_child(system, Element::new_measure(&[0, 500])).unwrap();
        let staff = doc
            .add_child(measure, Element::new_staff(1, NotationType::MensuralWhite))
            .unwrap();
        let layer = doc.add_child(staff, Element::new_layer(1)).unwrap();
        let ligature = doc.add_child(layer, Element::new(ElementKind::Ligature)).unwrap();
        (doc, layer, ligature)
    }

    #[test]
    fn unsupported_child_leaves_tree_unchanged() {
        let (mut doc, layer, ligature) = ligature_doc();
        let before = doc.children(ligature).len();
        let err = doc
            .add_child(ligature, Element::new(ElementKind::Harm))
            .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::UnsupportedChild {
                parent: ElementKind::Ligature,
                child: ElementKind::Harm
            }
        ));
        assert_eq!(doc.children(ligature).len(), before);
        assert!(doc.add_child(layer, Element::new(ElementKind::Measure)).is_err());
    }

    #[test]
    fn list_view_filters_and_invalidates() {
        let (mut doc, _, ligature) = ligature_doc();
        let n1 = doc
            .add_child(ligature, Element::new_note(Pname::C, 4, Duration::Brevis))
            .unwrap();
        doc.add_child(n1, Element::new(ElementKind::Dot)).unwrap();
        let supplied = doc.add_child(ligature, Element::new(ElementKind::Supplied)).unwrap();
        let n2 = doc
            .add_child(supplied, Element::new_note(Pname::D, 4, Duration::Brevis))
            .unwrap();
        assert_eq!(doc.list(ligature), vec![n1, n2]);

        // Adding below an editorial wrapper must drop the cached view too.
        let n3 = doc
            .add_child(supplied, Element::new_note(Pname::E, 4, Duration::Longa))
            .unwrap();
        assert_eq!(doc.list(ligature), vec![n1, n2, n3]);
        assert_eq!(doc.list_index(ligature, n3), Some(2));
    }

    #[test]
    fn ancestor_and_descendant_lookup() {
        let (mut doc, layer, ligature) = ligature_doc();
        let note = doc
            .add_child(ligature, Element::new_note(Pname::G, 3, Duration::Longa).with_id("n1"))
            .unwrap();
        let staff = doc.first_ancestor(note, ElementKind::Staff).unwrap();
        assert_eq!(doc.parent(layer), Some(staff));
        assert_eq!(doc.find_by_xml_id("n1"), Some(note));
        assert_eq!(doc.find_descendant_by_kind(layer, ElementKind::Note, Some(1)), None);
        assert_eq!(
            doc.find_descendant_by_kind(layer, ElementKind::Note, Some(2)),
            Some(note)
        );
    }
}
