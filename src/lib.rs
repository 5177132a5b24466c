//! Layout-adjustment passes for a music notation element tree.
//!
//! The tree is an arena [`Document`] of [`Element`]s. Passes walk it through
//! the [`Functor`] protocol; [`LayoutPasses`] runs the whole sequence and
//! returns a [`LayoutReport`].
//!
//! # Example
//! ```
//! use scorelayout::{
//!     Document, Element, ElementKind, GlyphMetrics, LayoutPasses, NotationType, UnitMetrics,
//! };
//!
//! let mut doc = Document::default();
//! let system = doc.add_child(doc.root(), Element::new_system(2000)).unwrap();
//! let measure = doc.add_child(system, Element::new_measure(&[0, 400])).unwrap();
//! doc.add_child(measure, Element::new_staff(1, NotationType::Cmn)).unwrap();
//! doc.add_child(measure, Element::new(ElementKind::Harm).with_staff(&[1])).unwrap();
//!
//! let metrics = UnitMetrics::new(&doc.options);
//! let mut measurer = |doc: &mut Document, _: &dyn GlyphMetrics| {
//!     if let Some(measure) = doc.get_mut(measure).and_then(|m| m.measure_mut()) {
//!         measure.aligner.set_positions(&[0, 400]);
//!     }
//! };
//! let report = LayoutPasses::new(&metrics).run(&mut doc, &mut measurer);
//! assert_eq!(report.controls[0].grp_id, 1);
//! ```

pub mod aligner;
mod control;
pub mod document;
pub mod error;
mod facsimile;
pub mod functor;
pub mod layout;
pub mod midi;
pub mod model;
pub mod options;
pub mod transpose;

pub use aligner::*;
pub use document::Document;
pub use error::{LayoutError, Result};
pub use functor::{Functor, FunctorCode, VisitFn};
pub use layout::*;
pub use model::*;
pub use options::LayoutOptions;
pub use transpose::{IntervalTransposer, TransPitch, Transpose, Transposer};

/// Run all layout passes with metrics derived from the document options
/// and render the report as JSON.
pub fn layout_to_json(doc: &mut Document, measurer: &mut dyn Measurer) -> Result<String> {
    let metrics = UnitMetrics::new(&doc.options);
    let report = LayoutPasses::new(&metrics).run(doc, measurer);
    report_to_json(&report)
}
