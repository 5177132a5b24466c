//! Layout-adjustment passes over the element tree.
//!
//! Every pass is a [`Functor`](crate::functor::Functor) driven by
//! [`Document::process`]. [`LayoutPasses`] runs them in the order they
//! depend on each other; measurement itself happens outside this crate and
//! plugs in through [`Measurer`].

mod constants;
mod harm_grps;
mod ligature;
mod metrics;
mod overflow;
mod prepare;
mod report;
mod reset;

pub use harm_grps::{
    adjust_harm_grps_spacing, prepare_floating_grps, AdjustHarmGrpsSpacing, PrepareFloatingGrps,
};
pub use ligature::{
    calc_ligature_note_pos, compute_offsets, compute_shapes, CalcLigatureNotePos, LigatureNote,
};
pub use metrics::{GlyphMetrics, UnitMetrics};
pub use overflow::{adjust_x_overflow, AdjustXOverflow, SystemOverflow};
pub use prepare::{
    prepare_drawing_place, prepare_pointers, prepare_rpt, PrepareDrawingPlace, PreparePointers,
    PrepareRpt,
};
pub use report::{
    report_to_json, ControlReport, LayoutReport, LigatureReport, RptReport, SystemReport,
};
pub use reset::{reset_data, ResetData};

use crate::document::Document;

/// Measurement step: registers floating positioners in the system aligners
/// and sets the alignment positions of every measure.
pub trait Measurer {
    fn measure(&mut self, doc: &mut Document, metrics: &dyn GlyphMetrics);
}

impl<F> Measurer for F
where
    F: FnMut(&mut Document, &dyn GlyphMetrics),
{
    fn measure(&mut self, doc: &mut Document, metrics: &dyn GlyphMetrics) {
        self(doc, metrics)
    }
}

/// Runs the full pass sequence over a document.
pub struct LayoutPasses<'a> {
    metrics: &'a dyn GlyphMetrics,
}

impl<'a> LayoutPasses<'a> {
    pub fn new(metrics: &'a dyn GlyphMetrics) -> Self {
        Self { metrics }
    }

    pub fn run(&self, doc: &mut Document, measurer: &mut dyn Measurer) -> LayoutReport {
        reset_data(doc);

        let unresolved = prepare_pointers(doc);
        if unresolved > 0 {
            log::debug!("{unresolved} references left unresolved");
        }
        prepare_floating_grps(doc);
        prepare_drawing_place(doc);
        prepare_rpt(doc);
        let ligatures = calc_ligature_note_pos(doc, self.metrics);

        measurer.measure(doc, self.metrics);

        let requests = adjust_harm_grps_spacing(doc, self.metrics);
        let overflows = adjust_x_overflow(doc);
        log::debug!(
            "layout done: {ligatures} ligatures, {requests} spacing requests, {} overflowing systems",
            overflows.len()
        );

        LayoutReport::collect(doc)
    }
}
