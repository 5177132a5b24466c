//! Tree traversal with per-node callbacks.
//!
//! A pass is a type implementing [`Functor`]. Its fields are the state
//! threaded through the whole traversal: the only channel between visits.
//! Nodes are visited depth-first, pre-order, children in document order.

use crate::document::Document;
use crate::model::ElementId;

/// What the traversal does after a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctorCode {
    /// Descend into the children, then move on to the next sibling.
    Continue,
    /// Skip the children (and the end visit) but keep going with the next
    /// sibling.
    Siblings,
    /// Stop the whole traversal.
    Stop,
}

pub trait Functor {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode;

    /// Called after the children of a node visited with
    /// [`FunctorCode::Continue`].
    fn visit_end(&mut self, _doc: &mut Document, _id: ElementId) -> FunctorCode {
        FunctorCode::Continue
    }
}

/// Adapter running a closure as a functor.
pub struct VisitFn<F>(pub F);

impl<F> Functor for VisitFn<F>
where
    F: FnMut(&mut Document, ElementId) -> FunctorCode,
{
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        (self.0)(doc, id)
    }
}

impl Document {
    /// Run `functor` over the whole tree. Returns [`FunctorCode::Stop`] when
    /// a visit aborted the traversal.
    pub fn process<F: Functor + ?Sized>(&mut self, functor: &mut F) -> FunctorCode {
        let root = self.root();
        self.process_from(root, functor)
    }

    /// Run `functor` over `id` and its subtree.
    pub fn process_from<F: Functor + ?Sized>(&mut self, id: ElementId, functor: &mut F) -> FunctorCode {
        match self.walk(id, functor) {
            FunctorCode::Stop => FunctorCode::Stop,
            _ => FunctorCode::Continue,
        }
    }

    /// Run `functor` over the children of `id` without visiting `id` itself.
    /// Used by visits that drive a nested traversal of their own subtree.
    pub fn process_children<F: Functor + ?Sized>(
        &mut self,
        id: ElementId,
        functor: &mut F,
    ) -> FunctorCode {
        match self.walk_children(id, functor) {
            FunctorCode::Stop => FunctorCode::Stop,
            _ => FunctorCode::Continue,
        }
    }

    fn walk<F: Functor + ?Sized>(&mut self, id: ElementId, functor: &mut F) -> FunctorCode {
        match functor.visit(self, id) {
            FunctorCode::Stop => return FunctorCode::Stop,
            FunctorCode::Siblings => return FunctorCode::Continue,
            FunctorCode::Continue => {}
        }
        if self.walk_children(id, functor) == FunctorCode::Stop {
            return FunctorCode::Stop;
        }
        match functor.visit_end(self, id) {
            FunctorCode::Stop => FunctorCode::Stop,
            _ => FunctorCode::Continue,
        }
    }

    fn walk_children<F: Functor + ?Sized>(&mut self, id: ElementId, functor: &mut F) -> FunctorCode {
        // Children are re-read on every step: visits may append to the tree.
        let mut i = 0;
        while let Some(&child) = self.children(id).get(i) {
            if self.walk(child, functor) == FunctorCode::Stop {
                return FunctorCode::Stop;
            }
            i += 1;
        }
        FunctorCode::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementKind, NotationType};

    fn two_measures() -> Document {
        let mut doc = Document::default();
        let system = doc.add_child(doc.root(), Element::new_system(1000)).unwrap();
        for _ in 0..2 {
            let measure = doc.add_child(system, Element::new_measure(&[0, 100])).unwrap();
            let staff = doc
                .add_child(measure, Element::new_staff(1, NotationType::Cmn))
                .unwrap();
            doc.add_child(staff, Element::new_layer(1)).unwrap();
            doc.add_child(measure, Element::new(ElementKind::Dynam)).unwrap();
        }
        doc
    }

    fn kinds_visited(doc: &mut Document, on: impl Fn(ElementKind) -> FunctorCode) -> Vec<ElementKind> {
        let mut visited = Vec::new();
        doc.process(&mut VisitFn(|doc: &mut Document, id: ElementId| {
            let kind = doc.kind(id).unwrap();
            visited.push(kind);
            on(kind)
        }));
        visited
    }

    #[test]
    fn pre_order_in_document_order() {
        use ElementKind::*;
        let mut doc = two_measures();
        let visited = kinds_visited(&mut doc, |_| FunctorCode::Continue);
        assert_eq!(
            visited,
            vec![Root, System, Measure, Staff, Layer, Dynam, Measure, Staff, Layer, Dynam]
        );
    }

    #[test]
    fn siblings_skips_subtree_only() {
        use ElementKind::*;
        let mut doc = two_measures();
        let visited = kinds_visited(&mut doc, |kind| {
            if kind == Staff {
                FunctorCode::Siblings
            } else {
                FunctorCode::Continue
            }
        });
        assert_eq!(visited, vec![Root, System, Measure, Staff, Dynam, Measure, Staff, Dynam]);
    }

    #[test]
    fn stop_aborts_everything() {
        use ElementKind::*;
        let mut doc = two_measures();
        let mut visited = Vec::new();
        let code = doc.process(&mut VisitFn(|doc: &mut Document, id: ElementId| {
            let kind = doc.kind(id).unwrap();
            visited.push(kind);
            if kind == Layer {
                FunctorCode::Stop
            } else {
                FunctorCode::Continue
            }
        }));
        assert_eq!(code, FunctorCode::Stop);
        assert_eq!(visited, vec![Root, System, Measure, Staff, Layer]);
    }

    struct EndCounter {
        ends: usize,
    }

    impl Functor for EndCounter {
        fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
            match doc.kind(id) {
                Some(ElementKind::Staff) => FunctorCode::Siblings,
                _ => FunctorCode::Continue,
            }
        }

        fn visit_end(&mut self, _doc: &mut Document, _id: ElementId) -> FunctorCode {
            self.ends += 1;
            FunctorCode::Continue
        }
    }

    #[test]
    fn end_visit_skipped_for_siblings() {
        let mut doc = two_measures();
        let mut counter = EndCounter { ends: 0 };
        doc.process(&mut counter);
        // root, system, 2 measures, 2 dynams; staves were skipped.
        assert_eq!(counter.ends, 6);
    }
}
