//! Facsimile lookups: zones of scanned surfaces and their extent.

use crate::document::Document;
use crate::model::{ElementId, ElementKind};

impl Document {
    /// Zone with the given xml id below `facsimile`.
    pub fn find_zone_by_id(&self, facsimile: ElementId, zone_id: &str) -> Option<ElementId> {
        self.find_all_descendants_by_kind(facsimile, ElementKind::Zone)
            .into_iter()
            .find(|&z| {
                self.get(z)
                    .and_then(|e| e.xml_id.as_deref())
                    .is_some_and(|id| id == zone_id)
            })
    }

    /// Right extent of a surface: its own `lrx` when set, otherwise the
    /// rightmost zone edge.
    pub fn surface_max_x(&self, surface: ElementId) -> i32 {
        if let Some(lrx) = self.get(surface).and_then(|e| e.surface()).and_then(|s| s.lrx) {
            return lrx;
        }
        self.zones(surface).map(|(_, _, lrx, _)| lrx).max().unwrap_or(0)
    }

    /// Bottom extent of a surface, see [`Document::surface_max_x`].
    pub fn surface_max_y(&self, surface: ElementId) -> i32 {
        if let Some(lry) = self.get(surface).and_then(|e| e.surface()).and_then(|s| s.lry) {
            return lry;
        }
        self.zones(surface).map(|(_, _, _, lry)| lry).max().unwrap_or(0)
    }

    /// Largest right extent over all surfaces, 0 when there is none.
    pub fn facsimile_max_x(&self, facsimile: ElementId) -> i32 {
        self.find_all_descendants_by_kind(facsimile, ElementKind::Surface)
            .into_iter()
            .map(|s| self.surface_max_x(s))
            .fold(0, i32::max)
    }

    pub fn facsimile_max_y(&self, facsimile: ElementId) -> i32 {
        self.find_all_descendants_by_kind(facsimile, ElementKind::Surface)
            .into_iter()
            .map(|s| self.surface_max_y(s))
            .fold(0, i32::max)
    }

    fn zones(&self, surface: ElementId) -> impl Iterator<Item = (i32, i32, i32, i32)> + '_ {
        self.find_all_descendants_by_kind(surface, ElementKind::Zone)
            .into_iter()
            .filter_map(|z| self.get(z).and_then(|e| e.zone()))
            .map(|z| (z.ulx, z.uly, z.lrx, z.lry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Element;

    #[test]
    fn extent_covers_all_surfaces() {
        let mut doc = Document::default();
        let facsimile = doc
            .add_child(doc.root(), Element::new(ElementKind::Facsimile))
            .unwrap();
        let first = doc.add_child(facsimile, Element::new(ElementKind::Surface)).unwrap();
        doc.add_child(first, Element::new_zone(0, 0, 300, 120).with_id("z1"))
            .unwrap();
        let z2 = doc
            .add_child(first, Element::new_zone(10, 130, 280, 400).with_id("z2"))
            .unwrap();
        let second = doc.add_child(facsimile, Element::new(ElementKind::Surface)).unwrap();
        doc.add_child(second, Element::new_zone(0, 0, 500, 90)).unwrap();

        assert_eq!(doc.facsimile_max_x(facsimile), 500);
        assert_eq!(doc.facsimile_max_y(facsimile), 400);
        assert_eq!(doc.find_zone_by_id(facsimile, "z2"), Some(z2));
        assert_eq!(doc.find_zone_by_id(facsimile, "z9"), None);
        assert!(doc
            .add_child(facsimile, Element::new(ElementKind::Zone))
            .is_err());
    }

    #[test]
    fn surface_extent_overrides_zones() {
        let mut doc = Document::default();
        let facsimile = doc
            .add_child(doc.root(), Element::new(ElementKind::Facsimile))
            .unwrap();
        let surface = doc
            .add_child(facsimile, Element::new_surface(Some(2000), None))
            .unwrap();
        doc.add_child(surface, Element::new_zone(0, 0, 300, 700)).unwrap();
        assert_eq!(doc.surface_max_x(surface), 2000);
        assert_eq!(doc.surface_max_y(surface), 700);
    }
}
