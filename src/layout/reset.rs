//! Clears everything the layout passes compute, so a following run starts
//! from the same state as a freshly built tree.

use crate::document::Document;
use crate::functor::{Functor, FunctorCode};
use crate::model::{Capabilities, ElementId};

#[derive(Debug, Default)]
pub struct ResetData;

impl Functor for ResetData {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        let Some(element) = doc.get_mut(id) else {
            return FunctorCode::Siblings;
        };
        element.reset_drawing();
        if element.kind().capabilities().contains(Capabilities::OBJECT_LIST) {
            // Rebuild the list view on next use.
            doc.modify(id);
        }
        FunctorCode::Continue
    }
}

pub fn reset_data(doc: &mut Document) {
    doc.process(&mut ResetData);
}
