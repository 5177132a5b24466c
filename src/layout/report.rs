//! Snapshot of everything the layout passes computed.

use serde::Serialize;

use crate::document::Document;
use crate::error::Result;
use crate::functor::{FunctorCode, VisitFn};
use crate::model::{ElementBody, ElementId, ElementKind, LigatureShape, StaffRel};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutReport {
    pub systems: Vec<SystemReport>,
    pub controls: Vec<ControlReport>,
    pub ligatures: Vec<LigatureReport>,
    pub measure_repeats: Vec<RptReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemReport {
    pub id: ElementId,
    pub drawing_width: i32,
    pub required_width: Option<i32>,
    pub positioners: usize,
    /// Alignment positions, one list per measure.
    pub measures: Vec<Vec<i32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlReport {
    pub id: ElementId,
    pub grp_id: i32,
    pub place: Option<StaffRel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LigatureReport {
    pub id: ElementId,
    pub shapes: Vec<LigatureShape>,
    pub offsets: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RptReport {
    pub id: ElementId,
    pub count: i32,
}

impl LayoutReport {
    /// Collect the report in document order.
    pub fn collect(doc: &mut Document) -> Self {
        let mut report = LayoutReport::default();
        doc.process(&mut VisitFn(|doc: &mut Document, id: ElementId| {
            let Some(element) = doc.get(id) else {
                return FunctorCode::Siblings;
            };
            match &element.body {
                ElementBody::System(system) => report.systems.push(SystemReport {
                    id,
                    drawing_width: system.drawing_width,
                    required_width: system.required_width(),
                    positioners: system.aligner.positioners().len(),
                    measures: Vec::new(),
                }),
                ElementBody::Measure(measure) => {
                    let positions = measure.aligner.alignments().iter().map(|a| a.x_rel).collect();
                    if let Some(system) = report.systems.last_mut() {
                        system.measures.push(positions);
                    }
                }
                ElementBody::Control(control) => report.controls.push(ControlReport {
                    id,
                    grp_id: control.drawing_grp_id(),
                    place: control.drawing_place(),
                }),
                ElementBody::Ligature(ligature) => {
                    let shapes = ligature.drawing_shapes().to_vec();
                    let offsets = doc
                        .find_all_descendants_by_kind(id, ElementKind::Note)
                        .into_iter()
                        .filter_map(|n| doc.get(n).and_then(|e| e.note()))
                        .map(|n| n.drawing_x_rel())
                        .collect();
                    report.ligatures.push(LigatureReport { id, shapes, offsets });
                }
                ElementBody::MRpt(mrpt) => report.measure_repeats.push(RptReport {
                    id,
                    count: mrpt.drawing_measure_count(),
                }),
                _ => {}
            }
            FunctorCode::Continue
        }));
        report
    }
}

/// Render a report as pretty-printed JSON.
pub fn report_to_json(report: &LayoutReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
