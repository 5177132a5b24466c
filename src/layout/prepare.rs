//! Preparation passes run before measurement: pointer resolution, vertical
//! placement of control elements and measure repeat numbering.

use std::collections::HashMap;

use crate::document::Document;
use crate::functor::{Functor, FunctorCode, VisitFn};
use crate::model::{id_fragment, Capabilities, ElementId, ElementKind, StaffRel};

// ═══════════════════════════════════════════════════════════════════════
// Pointers
// ═══════════════════════════════════════════════════════════════════════

/// Resolves `@startid`, `@endid`, plist entries and linking ids of control
/// elements to element handles.
#[derive(Debug, Default)]
pub struct PreparePointers {
    ids: HashMap<String, ElementId>,
    unresolved: usize,
}

impl PreparePointers {
    /// Collect the xml ids of `doc`. The first element with a given id wins.
    pub fn new(doc: &mut Document) -> Self {
        let mut ids = HashMap::new();
        doc.process(&mut VisitFn(|doc: &mut Document, id: ElementId| {
            if let Some(xml_id) = doc.get(id).and_then(|e| e.xml_id.clone()) {
                ids.entry(xml_id).or_insert(id);
            }
            FunctorCode::Continue
        }));
        Self { ids, unresolved: 0 }
    }

    /// References that could not be resolved so far.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    fn lookup(&mut self, reference: &str) -> Option<ElementId> {
        let found = self.ids.get(id_fragment(reference)).copied();
        if found.is_none() {
            log::debug!("Reference '{reference}' could not be resolved");
            self.unresolved += 1;
        }
        found
    }

    fn visit_control(&mut self, doc: &mut Document, id: ElementId, kind: ElementKind) {
        let Some(control) = doc.get(id).and_then(|e| e.control()).cloned() else {
            return;
        };
        let caps = kind.capabilities();

        let (start, end) = match &control.time {
            Some(time) => {
                let start = time.startid.as_deref().and_then(|r| self.lookup(r));
                let end = if caps.contains(Capabilities::TIME_SPANNING) {
                    time.endid.as_deref().and_then(|r| self.lookup(r))
                } else {
                    None
                };
                (start, end)
            }
            None => (None, None),
        };

        let targets: Vec<_> = control
            .linking
            .ids
            .iter()
            .filter_map(|(&relation, reference)| Some((relation, self.lookup(reference)?)))
            .collect();

        let plist_refs: Vec<(ElementId, ElementKind)> = match &control.plist {
            Some(plist) => {
                let mut plist = plist.clone();
                plist.extract_ids();
                plist
                    .ids
                    .iter()
                    .filter_map(|r| self.lookup(r))
                    .filter_map(|target| Some((target, doc.kind(target)?)))
                    .collect()
            }
            None => Vec::new(),
        };

        let Some(control) = doc.get_mut(id).and_then(|e| e.control_mut()) else {
            return;
        };
        if let Some(time) = control.time.as_mut() {
            time.start = start;
            time.end = end;
        }
        control.linking.targets = targets.into_iter().collect();
        if let Some(plist) = control.plist.as_mut() {
            plist.extract_ids();
            for (target, target_kind) in plist_refs {
                if !plist.set_ref(target, target_kind) {
                    log::debug!("{target_kind} {target:?} cannot be referenced from a plist");
                }
            }
        }
    }
}

impl Functor for PreparePointers {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        match doc.kind(id) {
            Some(kind) if kind.is_control_element() => {
                self.visit_control(doc, id, kind);
                FunctorCode::Continue
            }
            Some(_) => FunctorCode::Continue,
            None => FunctorCode::Siblings,
        }
    }
}

/// Resolve all pointers; returns the number of unresolved references.
pub fn prepare_pointers(doc: &mut Document) -> usize {
    let mut functor = PreparePointers::new(doc);
    doc.process(&mut functor);
    functor.unresolved()
}

// ═══════════════════════════════════════════════════════════════════════
// Placement
// ═══════════════════════════════════════════════════════════════════════

/// Explicit `@place` when given, otherwise the placement derived from the
/// stem direction, above by default.
#[derive(Debug, Default)]
pub struct PrepareDrawingPlace;

impl Functor for PrepareDrawingPlace {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        let Some(control) = doc.get(id).and_then(|e| e.control()) else {
            return FunctorCode::Continue;
        };
        let explicit = control.text_dir.as_ref().and_then(|t| t.place);
        let place = explicit.unwrap_or_else(|| doc.layer_place(id, StaffRel::Above));
        if let Some(control) = doc.get_mut(id).and_then(|e| e.control_mut()) {
            control.drawing_place = Some(place);
        }
        FunctorCode::Continue
    }
}

pub fn prepare_drawing_place(doc: &mut Document) {
    doc.process(&mut PrepareDrawingPlace);
}

// ═══════════════════════════════════════════════════════════════════════
// Measure repeats
// ═══════════════════════════════════════════════════════════════════════

/// Numbers consecutive measure repeats of one staff: 2 for the first one,
/// then one more for each following.
#[derive(Debug)]
pub struct PrepareRpt {
    staff_n: i32,
    multi_number: bool,
    current_count: Option<i32>,
}

impl PrepareRpt {
    pub fn new(staff_n: i32, multi_number: bool) -> Self {
        Self {
            staff_n,
            multi_number,
            current_count: None,
        }
    }
}

impl Functor for PrepareRpt {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        match doc.kind(id) {
            Some(ElementKind::Staff) => {
                let n = doc.get(id).and_then(|e| e.staff()).map(|s| s.n);
                if n == Some(self.staff_n) {
                    FunctorCode::Continue
                } else {
                    FunctorCode::Siblings
                }
            }
            Some(ElementKind::MRpt) => {
                if !self.multi_number {
                    return FunctorCode::Continue;
                }
                let count = self.current_count.map_or(2, |c| c + 1);
                if let Some(mrpt) = doc.get_mut(id).and_then(|e| e.mrpt_mut()) {
                    mrpt.drawing_measure_count = count;
                }
                self.current_count = Some(count);
                FunctorCode::Continue
            }
            Some(_) => FunctorCode::Continue,
            None => FunctorCode::Siblings,
        }
    }
}

/// Run the repeat numbering once per staff number found in the document.
pub fn prepare_rpt(doc: &mut Document) {
    let multi_number = doc.options.multi_number;
    let mut staff_ns: Vec<i32> = doc
        .find_all_descendants_by_kind(doc.root(), ElementKind::Staff)
        .into_iter()
        .filter_map(|s| doc.get(s).and_then(|e| e.staff()).map(|s| s.n))
        .collect();
    staff_ns.sort_unstable();
    staff_ns.dedup();

    for n in staff_ns {
        doc.process(&mut PrepareRpt::new(n, multi_number));
    }
}
