//! Integration tests for the tree API and the passes outside layout:
//! structural checks, pointer resolution, transposition and MIDI output.

use pretty_assertions::assert_eq;
use scorelayout::midi::{generate_midi, to_smf};
use scorelayout::transpose::transpose;
use scorelayout::{
    prepare_pointers, Document, Duration, Element, ElementId, ElementKind, IntervalTransposer,
    LayoutError, LayoutOptions, NotationType, Pname, StaffRel, StemDirection,
};

fn measure_with_layer(doc: &mut Document) -> (ElementId, ElementId) {
    let system = doc.add_child(doc.root(), Element::new_system(1500)).unwrap();
    let measure = doc.add_child(system, Element::new_measure(&[0, 600])).unwrap();
    let staff = doc
        .add_child(measure, Element::new_staff(1, NotationType::Cmn))
        .unwrap();
    let layer = doc.add_child(staff, Element::new_layer(1)).unwrap();
    (measure, layer)
}

// ═══════════════════════════════════════════════════════════════════════
// Tree structure
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn rejected_children_leave_the_tree_untouched() {
    let mut doc = Document::default();
    let (measure, layer) = measure_with_layer(&mut doc);
    let before: Vec<usize> = [measure, layer].iter().map(|&id| doc.children(id).len()).collect();

    let err = doc
        .add_child(layer, Element::new(ElementKind::Dynam))
        .unwrap_err();
    assert!(matches!(err, LayoutError::UnsupportedChild { .. }));
    assert_eq!(err.to_string(), "'dynam' is not a supported child of 'layer'");
    assert!(doc.add_child(measure, Element::new(ElementKind::Note)).is_err());

    let after: Vec<usize> = [measure, layer].iter().map(|&id| doc.children(id).len()).collect();
    assert_eq!(before, after);
}

#[test]
fn editorial_wrappers_are_transparent_for_lookups() {
    let mut doc = Document::default();
    let (measure, _) = measure_with_layer(&mut doc);
    let app = doc.add_child(measure, Element::new(ElementKind::App)).unwrap();
    let lem = doc.add_child(app, Element::new(ElementKind::Lem)).unwrap();
    let dir = doc
        .add_child(lem, Element::new(ElementKind::Dir).with_id("d1"))
        .unwrap();
    doc.add_child(dir, Element::new_text("rit.")).unwrap();

    assert_eq!(doc.find_by_xml_id("d1"), Some(dir));
    assert_eq!(doc.first_ancestor(dir, ElementKind::Measure), Some(measure));
    assert_eq!(doc.text_content(measure), "rit.");
}

// ═══════════════════════════════════════════════════════════════════════
// Pointers and placement
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn ornament_placement_follows_resolved_start() {
    let mut doc = Document::default();
    let (measure, layer) = measure_with_layer(&mut doc);
    doc.add_child(
        layer,
        Element::new_note(Pname::F, 5, Duration::Minima)
            .with_id("n1")
            .with_stem_dir(StemDirection::Up),
    )
    .unwrap();
    let turn = doc
        .add_child(measure, Element::new(ElementKind::Turn).with_startid("#n1"))
        .unwrap();

    assert_eq!(doc.layer_place(turn, StaffRel::Below), StaffRel::Below);
    assert_eq!(prepare_pointers(&mut doc), 0);
    assert_eq!(doc.layer_place(turn, StaffRel::Below), StaffRel::Above);
}

// ═══════════════════════════════════════════════════════════════════════
// Transposition
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn harm_labels_are_transposed_in_place() {
    let mut doc = Document::default();
    let (measure, _) = measure_with_layer(&mut doc);
    let labels = ["C", "Ebmaj7", "G#m7/F#", "N.C."];
    let harms: Vec<ElementId> = labels
        .iter()
        .map(|label| {
            let harm = doc.add_child(measure, Element::new(ElementKind::Harm)).unwrap();
            doc.add_child(harm, Element::new_text(label)).unwrap();
            harm
        })
        .collect();

    // Up a perfect fourth.
    transpose(&mut doc, &IntervalTransposer::new(3, 5));
    let result: Vec<String> = harms.iter().map(|&h| doc.text_content(h)).collect();
    assert_eq!(result, vec!["F", "A♭maj7", "C♯m7/B", "N.C."]);
}

// ═══════════════════════════════════════════════════════════════════════
// MIDI
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn ligature_notes_play_in_sequence() {
    let mut doc = Document::default();
    let (_, layer) = measure_with_layer(&mut doc);
    let ligature = doc.add_child(layer, Element::new(ElementKind::Ligature)).unwrap();
    for (pname, dur) in [(Pname::C, Duration::Brevis), (Pname::D, Duration::Longa)] {
        doc.add_child(ligature, Element::new_note(pname, 4, dur))
            .unwrap();
    }

    let tracks = generate_midi(&mut doc);
    let ticks: Vec<(u32, u8)> = tracks[&1].iter().map(|e| (e.tick, e.bytes[0])).collect();
    assert_eq!(
        ticks,
        vec![(0, 0x90), (3840, 0x80), (3840, 0x90), (11520, 0x80)]
    );

    let smf = to_smf(&tracks);
    assert_eq!(&smf[0..4], b"MThd");
    assert!(smf.windows(7).any(|w| w == b"Staff 1"));
}

// ═══════════════════════════════════════════════════════════════════════
// Options
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn options_load_from_json() {
    let options = LayoutOptions::from_json(
        r#"{ "unit": 10, "ligature_as_bracket": true, "multi_number": false }"#,
    )
    .unwrap();
    assert_eq!(options.unit, 10);
    assert!(options.ligature_as_bracket);
    assert!(!options.multi_number);
    assert_eq!(options.lyric_size_ratio(), 1.0);

    let err = LayoutOptions::from_json(r#"{ "unit": "wide" }"#).unwrap_err();
    assert!(matches!(err, LayoutError::Json(_)));
}
