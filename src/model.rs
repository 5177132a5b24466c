//! Data model for the notation element tree.
//!
//! Every node carries a closed [`ElementKind`] tag and an [`ElementBody`]
//! holding the data of that kind. Optional field sets (time pointers, plist,
//! text direction, ...) are attached to control elements according to the
//! [`Capabilities`] mask of their kind.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::aligner::{MeasureAligner, SystemAligner};

// ═══════════════════════════════════════════════════════════════════════
// Handles and kinds
// ═══════════════════════════════════════════════════════════════════════

/// Non-owning handle to an element of a [`crate::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Root,
    System,
    Measure,
    Staff,
    Layer,
    // Layer elements
    Note,
    Dot,
    Ligature,
    MRpt,
    MRpt2,
    MSpace,
    // Control elements
    Dir,
    Dynam,
    Tempo,
    Harm,
    Annot,
    Trill,
    Mordent,
    Turn,
    // Text elements
    Rend,
    Text,
    Lb,
    Fb,
    LabelAbbr,
    // Facsimile
    Facsimile,
    Surface,
    Zone,
    // Editorial markup
    App,
    Lem,
    Rdg,
    Supplied,
    Unclear,
}

impl ElementKind {
    /// Element name as used in the encoding.
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Root => "root",
            ElementKind::System => "system",
            ElementKind::Measure => "measure",
            ElementKind::Staff => "staff",
            ElementKind::Layer => "layer",
            ElementKind::Note => "note",
            ElementKind::Dot => "dot",
            ElementKind::Ligature => "ligature",
            ElementKind::MRpt => "mRpt",
            ElementKind::MRpt2 => "mRpt2",
            ElementKind::MSpace => "mSpace",
            ElementKind::Dir => "dir",
            ElementKind::Dynam => "dynam",
            ElementKind::Tempo => "tempo",
            ElementKind::Harm => "harm",
            ElementKind::Annot => "annot",
            ElementKind::Trill => "trill",
            ElementKind::Mordent => "mordent",
            ElementKind::Turn => "turn",
            ElementKind::Rend => "rend",
            ElementKind::Text => "text",
            ElementKind::Lb => "lb",
            ElementKind::Fb => "fb",
            ElementKind::LabelAbbr => "labelAbbr",
            ElementKind::Facsimile => "facsimile",
            ElementKind::Surface => "surface",
            ElementKind::Zone => "zone",
            ElementKind::App => "app",
            ElementKind::Lem => "lem",
            ElementKind::Rdg => "rdg",
            ElementKind::Supplied => "supplied",
            ElementKind::Unclear => "unclear",
        }
    }

    /// Floating elements drawn outside the note flow.
    pub fn is_control_element(self) -> bool {
        self.capabilities().contains(Capabilities::FLOATING)
    }

    pub fn is_layer_element(self) -> bool {
        matches!(
            self,
            ElementKind::Note
                | ElementKind::Dot
                | ElementKind::Ligature
                | ElementKind::MRpt
                | ElementKind::MRpt2
                | ElementKind::MSpace
        )
    }

    pub fn is_text_element(self) -> bool {
        matches!(self, ElementKind::Rend | ElementKind::Text | ElementKind::Lb)
    }

    pub fn is_editorial(self) -> bool {
        matches!(
            self,
            ElementKind::App
                | ElementKind::Lem
                | ElementKind::Rdg
                | ElementKind::Supplied
                | ElementKind::Unclear
        )
    }

    /// Field sets attached to elements of this kind.
    pub fn capabilities(self) -> Capabilities {
        use Capabilities as C;
        let control = C::LINKING | C::FLOATING;
        match self {
            ElementKind::Dir | ElementKind::Dynam | ElementKind::Harm => {
                control | C::TEXT_DIR | C::TEXT_LIST | C::TIME_SPANNING
            }
            ElementKind::Tempo => control | C::TEXT_DIR | C::TEXT_LIST | C::TIME_POINT,
            ElementKind::Annot => control | C::TEXT_LIST | C::PLIST | C::TIME_SPANNING,
            ElementKind::Trill => control | C::TIME_SPANNING,
            ElementKind::Mordent | ElementKind::Turn => control | C::TIME_POINT,
            ElementKind::Ligature => C::OBJECT_LIST,
            ElementKind::LabelAbbr => C::TEXT_LIST,
            _ => C::NONE,
        }
    }

    /// Whether `child` may be added under an element of this kind.
    pub fn supports_child(self, child: ElementKind) -> bool {
        use ElementKind as K;
        let text_content = child.is_text_element() || child.is_editorial();
        if text_content && self.capabilities().contains(Capabilities::TEXT_LIST) {
            return true;
        }
        match self {
            K::Root => matches!(child, K::System | K::Facsimile),
            K::System => child == K::Measure,
            K::Measure => child == K::Staff || child.is_control_element() || child.is_editorial(),
            K::Staff => matches!(child, K::Layer | K::LabelAbbr),
            K::Layer => child.is_layer_element() || child.is_editorial(),
            K::Ligature => matches!(child, K::Dot | K::Note) || child.is_editorial(),
            K::Note => child == K::Dot,
            K::Harm => child == K::Fb,
            K::Rend => text_content,
            K::Dir | K::Dynam | K::Tempo | K::Annot | K::LabelAbbr => false,
            K::Fb => child == K::Text || child.is_editorial(),
            K::Facsimile => child == K::Surface,
            K::Surface => child == K::Zone,
            K::App => matches!(child, K::Lem | K::Rdg),
            K::Lem | K::Rdg | K::Supplied | K::Unclear => {
                child.is_layer_element()
                    || child.is_control_element()
                    || child.is_text_element()
                    || child.is_editorial()
            }
            K::Trill | K::Mordent | K::Turn => false,
            K::Text | K::Lb | K::Dot | K::MRpt | K::MRpt2 | K::MSpace | K::Zone => false,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitmask of the optional field sets an element kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const LINKING: Self = Self(1 << 0);
    pub const TIME_POINT: Self = Self(1 << 1);
    /// Implies [`Capabilities::TIME_POINT`].
    pub const TIME_SPANNING: Self = Self((1 << 2) | (1 << 1));
    pub const PLIST: Self = Self(1 << 3);
    pub const TEXT_DIR: Self = Self(1 << 4);
    pub const TEXT_LIST: Self = Self(1 << 5);
    pub const OBJECT_LIST: Self = Self(1 << 6);
    pub const FLOATING: Self = Self(1 << 7);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Attribute values
// ═══════════════════════════════════════════════════════════════════════

/// Pitch name, C = 0 through B = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pname {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Pname {
    pub const ALL: [Pname; 7] = [
        Pname::C,
        Pname::D,
        Pname::E,
        Pname::F,
        Pname::G,
        Pname::A,
        Pname::B,
    ];

    pub fn step(self) -> i32 {
        self as i32
    }

    pub fn from_step(step: i32) -> Pname {
        Self::ALL[step.rem_euclid(7) as usize]
    }

    pub fn from_letter(letter: char) -> Option<Pname> {
        match letter {
            'C' => Some(Pname::C),
            'D' => Some(Pname::D),
            'E' => Some(Pname::E),
            'F' => Some(Pname::F),
            'G' => Some(Pname::G),
            'A' => Some(Pname::A),
            'B' => Some(Pname::B),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        ['C', 'D', 'E', 'F', 'G', 'A', 'B'][self as usize]
    }

    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        [0, 2, 4, 5, 7, 9, 11][self as usize]
    }
}

/// Written duration. Only the mensural values take part in ligatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Duration {
    Maxima,
    Longa,
    Brevis,
    Semibrevis,
    Minima,
    Semiminima,
}

impl Duration {
    /// Length in quarter notes.
    pub fn quarters(self) -> f64 {
        match self {
            Duration::Maxima => 32.0,
            Duration::Longa => 16.0,
            Duration::Brevis => 8.0,
            Duration::Semibrevis => 4.0,
            Duration::Minima => 2.0,
            Duration::Semiminima => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LigatureForm {
    Recta,
    Obliqua,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NotationType {
    #[default]
    Cmn,
    MensuralWhite,
    MensuralBlack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemDirection {
    Up,
    Down,
}

/// Placement relative to the staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffRel {
    Above,
    Below,
    Within,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    Left,
    Right,
    Center,
    Justify,
}

/// Drawing shape of one note in a ligature. Bit flags, combined with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LigatureShape(u8);

impl LigatureShape {
    pub const DEFAULT: Self = Self(0);
    pub const STEM_LEFT_UP: Self = Self(1);
    pub const STEM_LEFT_DOWN: Self = Self(2);
    pub const STEM_RIGHT_DOWN: Self = Self(8);
    pub const STACKED: Self = Self(16);
    pub const OBLIQUE: Self = Self(32);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for LigatureShape {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Capability interfaces
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkRelation {
    Corresp,
    Follows,
    Precedes,
    Next,
    Sameas,
}

/// Links to other elements by xml id.
#[derive(Debug, Clone, Default)]
pub struct LinkingInterface {
    pub ids: BTreeMap<LinkRelation, String>,
    pub(crate) targets: BTreeMap<LinkRelation, ElementId>,
}

impl LinkingInterface {
    pub fn target(&self, relation: LinkRelation) -> Option<ElementId> {
        self.targets.get(&relation).copied()
    }

    pub fn reset(&mut self) {
        self.targets.clear();
    }
}

/// Anchors of a floating element in the note flow. `end` is only resolved
/// for kinds with [`Capabilities::TIME_SPANNING`].
#[derive(Debug, Clone, Default)]
pub struct TimeInterface {
    pub startid: Option<String>,
    pub endid: Option<String>,
    /// Staff numbers the element is drawn on.
    pub staff: Vec<i32>,
    pub(crate) start: Option<ElementId>,
    pub(crate) end: Option<ElementId>,
}

impl TimeInterface {
    pub fn start(&self) -> Option<ElementId> {
        self.start
    }

    pub fn end(&self) -> Option<ElementId> {
        self.end
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.end = None;
    }
}

/// List of referenced elements.
#[derive(Debug, Clone, Default)]
pub struct PlistInterface {
    pub plist: Vec<String>,
    pub(crate) ids: Vec<String>,
    pub(crate) references: Vec<ElementId>,
}

impl PlistInterface {
    pub fn add_ref(&mut self, reference: &str) {
        if !self.plist.iter().any(|r| r == reference) {
            self.plist.push(reference.to_string());
        }
    }

    pub fn add_ref_allow_duplicate(&mut self, reference: &str) {
        self.plist.push(reference.to_string());
    }

    /// Record a resolved reference. Containers of the page and facsimile
    /// structure cannot be referenced.
    pub fn set_ref(&mut self, target: ElementId, kind: ElementKind) -> bool {
        if !Self::is_valid_ref(kind) {
            return false;
        }
        if !self.references.contains(&target) {
            self.references.push(target);
        }
        true
    }

    pub fn refs(&self) -> &[ElementId] {
        &self.references
    }

    pub fn is_valid_ref(kind: ElementKind) -> bool {
        !matches!(
            kind,
            ElementKind::Root
                | ElementKind::System
                | ElementKind::Facsimile
                | ElementKind::Surface
                | ElementKind::Zone
        )
    }

    /// Extract the id fragment of each plist entry (`file.mei#n1` -> `n1`).
    pub(crate) fn extract_ids(&mut self) {
        self.ids.clear();
        for uri in &self.plist {
            let id = id_fragment(uri);
            if id.is_empty() {
                log::error!("Cannot parse the anyURI '{uri}'");
            } else {
                self.ids.push(id.to_string());
            }
        }
    }

    pub fn reset(&mut self) {
        self.ids.clear();
        self.references.clear();
    }
}

/// Part after the last `#`, or the whole string when there is none.
pub(crate) fn id_fragment(uri: &str) -> &str {
    match uri.rfind('#') {
        Some(pos) if pos + 1 < uri.len() => &uri[pos + 1..],
        _ => uri,
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextDirInterface {
    pub place: Option<StaffRel>,
}

// ═══════════════════════════════════════════════════════════════════════
// Element bodies
// ═══════════════════════════════════════════════════════════════════════

/// Elements rendered out of the note flow: directives, dynamics, tempo
/// marks, harmony labels, annotations and ornaments.
#[derive(Debug, Clone, Default)]
pub struct ControlElement {
    /// Group number (`@n`), used by harmony labels.
    pub n: Option<String>,
    pub linking: LinkingInterface,
    pub time: Option<TimeInterface>,
    pub plist: Option<PlistInterface>,
    pub text_dir: Option<TextDirInterface>,
    pub(crate) drawing_grp_id: i32,
    pub(crate) drawing_place: Option<StaffRel>,
}

impl ControlElement {
    pub fn new(kind: ElementKind) -> Self {
        let caps = kind.capabilities();
        Self {
            time: caps
                .contains(Capabilities::TIME_POINT)
                .then(TimeInterface::default),
            plist: caps.contains(Capabilities::PLIST).then(PlistInterface::default),
            text_dir: caps
                .contains(Capabilities::TEXT_DIR)
                .then(TextDirInterface::default),
            ..Self::default()
        }
    }

    /// Drawing group id, 0 when ungrouped.
    pub fn drawing_grp_id(&self) -> i32 {
        self.drawing_grp_id
    }

    pub fn drawing_place(&self) -> Option<StaffRel> {
        self.drawing_place
    }

    pub fn start(&self) -> Option<ElementId> {
        self.time.as_ref().and_then(|t| t.start)
    }

    pub fn staff(&self) -> &[i32] {
        self.time.as_ref().map(|t| t.staff.as_slice()).unwrap_or(&[])
    }

    fn reset(&mut self) {
        self.drawing_grp_id = 0;
        self.drawing_place = None;
        self.linking.reset();
        if let Some(time) = self.time.as_mut() {
            time.reset();
        }
        if let Some(plist) = self.plist.as_mut() {
            plist.reset();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemData {
    pub aligner: SystemAligner,
    /// Width given by the justification of the system.
    pub drawing_width: i32,
    /// Right edge of the widest overflowing element, set by the overflow pass.
    pub(crate) required_width: Option<i32>,
}

impl SystemData {
    pub fn required_width(&self) -> Option<i32> {
        self.required_width
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeasureData {
    pub n: Option<i32>,
    pub aligner: MeasureAligner,
}

impl MeasureData {
    pub fn width(&self) -> i32 {
        self.aligner.width()
    }
}

#[derive(Debug, Clone)]
pub struct StaffData {
    pub n: i32,
    pub notation_type: NotationType,
    /// Staff size in percent.
    pub staff_size: i32,
}

impl Default for StaffData {
    fn default() -> Self {
        Self {
            n: 1,
            notation_type: NotationType::Cmn,
            staff_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayerData {
    pub n: i32,
    pub drawing_stem_dir: Option<StemDirection>,
}

#[derive(Debug, Clone)]
pub struct NoteData {
    pub pname: Pname,
    pub oct: i32,
    pub dur: Duration,
    /// Ligature form requested for the note and its successor.
    pub lig: Option<LigatureForm>,
    pub stem_dir: Option<StemDirection>,
    /// Index of the note's alignment in the measure grid.
    pub alignment: Option<usize>,
    pub(crate) drawing_x_rel: i32,
}

impl NoteData {
    pub fn new(pname: Pname, oct: i32, dur: Duration) -> Self {
        Self {
            pname,
            oct,
            dur,
            lig: None,
            stem_dir: None,
            alignment: None,
            drawing_x_rel: 0,
        }
    }

    /// Diatonic position counted in steps from C0.
    pub fn diatonic_pitch(&self) -> i32 {
        self.oct * 7 + self.pname.step()
    }

    pub fn midi_pitch(&self) -> i32 {
        (self.oct + 1) * 12 + self.pname.semitone()
    }

    pub fn drawing_x_rel(&self) -> i32 {
        self.drawing_x_rel
    }
}

#[derive(Debug, Clone, Default)]
pub struct LigatureData {
    pub form: Option<LigatureForm>,
    /// One shape per note in run order, or empty when not computed.
    pub(crate) drawing_shapes: Vec<LigatureShape>,
    /// Cached note view, dropped on structural change.
    pub(crate) list: Option<Vec<ElementId>>,
}

impl LigatureData {
    pub fn drawing_shapes(&self) -> &[LigatureShape] {
        &self.drawing_shapes
    }
}

#[derive(Debug, Clone, Default)]
pub struct MRptData {
    pub(crate) drawing_measure_count: i32,
}

impl MRptData {
    pub fn drawing_measure_count(&self) -> i32 {
        self.drawing_measure_count
    }
}

#[derive(Debug, Clone, Default)]
pub struct RendData {
    pub halign: Option<HorizontalAlignment>,
}

#[derive(Debug, Clone, Default)]
pub struct TextData {
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceData {
    pub lrx: Option<i32>,
    pub lry: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneData {
    pub ulx: i32,
    pub uly: i32,
    pub lrx: i32,
    pub lry: i32,
}

#[derive(Debug, Clone)]
pub enum ElementBody {
    /// Kinds without data of their own.
    Plain,
    System(SystemData),
    Measure(MeasureData),
    Staff(StaffData),
    Layer(LayerData),
    Note(NoteData),
    Ligature(LigatureData),
    MRpt(MRptData),
    Control(ControlElement),
    Rend(RendData),
    Text(TextData),
    Surface(SurfaceData),
    Zone(ZoneData),
}

impl ElementBody {
    fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::System => ElementBody::System(SystemData::default()),
            ElementKind::Measure => ElementBody::Measure(MeasureData::default()),
            ElementKind::Staff => ElementBody::Staff(StaffData::default()),
            ElementKind::Layer => ElementBody::Layer(LayerData::default()),
            ElementKind::Note => {
                ElementBody::Note(NoteData::new(Pname::C, 4, Duration::Semibrevis))
            }
            ElementKind::Ligature => ElementBody::Ligature(LigatureData::default()),
            ElementKind::MRpt => ElementBody::MRpt(MRptData::default()),
            ElementKind::Rend => ElementBody::Rend(RendData::default()),
            ElementKind::Text => ElementBody::Text(TextData::default()),
            ElementKind::Surface => ElementBody::Surface(SurfaceData::default()),
            ElementKind::Zone => ElementBody::Zone(ZoneData::default()),
            k if k.is_control_element() => ElementBody::Control(ControlElement::new(k)),
            _ => ElementBody::Plain,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Element
// ═══════════════════════════════════════════════════════════════════════

/// One node of the tree. Children are owned through the document arena;
/// `parent` is a back-reference.
#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    pub xml_id: Option<String>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) body: ElementBody,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            xml_id: None,
            parent: None,
            children: Vec::new(),
            body: ElementBody::for_kind(kind),
        }
    }

    pub fn new_system(drawing_width: i32) -> Self {
        let mut element = Self::new(ElementKind::System);
        if let ElementBody::System(system) = &mut element.body {
            system.drawing_width = drawing_width;
        }
        element
    }

    /// Measure with an alignment grid at the given positions. The last
    /// position is the right barline.
    pub fn new_measure(positions: &[i32]) -> Self {
        let mut element = Self::new(ElementKind::Measure);
        if let ElementBody::Measure(measure) = &mut element.body {
            measure.aligner = MeasureAligner::from_positions(positions);
        }
        element
    }

    pub fn new_staff(n: i32, notation_type: NotationType) -> Self {
        let mut element = Self::new(ElementKind::Staff);
        element.body = ElementBody::Staff(StaffData {
            n,
            notation_type,
            ..StaffData::default()
        });
        element
    }

    pub fn new_layer(n: i32) -> Self {
        let mut element = Self::new(ElementKind::Layer);
        element.body = ElementBody::Layer(LayerData {
            n,
            drawing_stem_dir: None,
        });
        element
    }

    pub fn new_note(pname: Pname, oct: i32, dur: Duration) -> Self {
        let mut element = Self::new(ElementKind::Note);
        element.body = ElementBody::Note(NoteData::new(pname, oct, dur));
        element
    }

    pub fn new_text(text: &str) -> Self {
        let mut element = Self::new(ElementKind::Text);
        element.body = ElementBody::Text(TextData {
            text: text.to_string(),
        });
        element
    }

    pub fn new_rend(halign: Option<HorizontalAlignment>) -> Self {
        let mut element = Self::new(ElementKind::Rend);
        element.body = ElementBody::Rend(RendData { halign });
        element
    }

    pub fn new_zone(ulx: i32, uly: i32, lrx: i32, lry: i32) -> Self {
        let mut element = Self::new(ElementKind::Zone);
        element.body = ElementBody::Zone(ZoneData { ulx, uly, lrx, lry });
        element
    }

    /// Surface with an explicit extent. Without one, the extent comes from
    /// its zones.
    pub fn new_surface(lrx: Option<i32>, lry: Option<i32>) -> Self {
        let mut element = Self::new(ElementKind::Surface);
        element.body = ElementBody::Surface(SurfaceData { lrx, lry });
        element
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.xml_id = Some(id.to_string());
        self
    }

    /// Group number of a control element.
    pub fn with_n(mut self, n: &str) -> Self {
        if let Some(control) = self.control_mut() {
            control.n = Some(n.to_string());
        }
        self
    }

    pub fn with_staff(mut self, staff: &[i32]) -> Self {
        if let Some(time) = self.control_mut().and_then(|c| c.time.as_mut()) {
            time.staff = staff.to_vec();
        }
        self
    }

    pub fn with_startid(mut self, startid: &str) -> Self {
        if let Some(time) = self.control_mut().and_then(|c| c.time.as_mut()) {
            time.startid = Some(startid.to_string());
        }
        self
    }

    pub fn with_endid(mut self, endid: &str) -> Self {
        if let Some(time) = self.control_mut().and_then(|c| c.time.as_mut()) {
            time.endid = Some(endid.to_string());
        }
        self
    }

    pub fn with_place(mut self, place: StaffRel) -> Self {
        if let Some(text_dir) = self.control_mut().and_then(|c| c.text_dir.as_mut()) {
            text_dir.place = Some(place);
        }
        self
    }

    pub fn with_lig(mut self, lig: LigatureForm) -> Self {
        if let Some(note) = self.note_mut() {
            note.lig = Some(lig);
        }
        self
    }

    pub fn with_stem_dir(mut self, dir: StemDirection) -> Self {
        if let Some(note) = self.note_mut() {
            note.stem_dir = Some(dir);
        }
        self
    }

    /// Alignment index of a note in its measure grid.
    pub fn at_alignment(mut self, index: usize) -> Self {
        if let Some(note) = self.note_mut() {
            note.alignment = Some(index);
        }
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn system(&self) -> Option<&SystemData> {
        match &self.body {
            ElementBody::System(s) => Some(s),
            _ => None,
        }
    }

    pub fn system_mut(&mut self) -> Option<&mut SystemData> {
        match &mut self.body {
            ElementBody::System(s) => Some(s),
            _ => None,
        }
    }

    pub fn measure(&self) -> Option<&MeasureData> {
        match &self.body {
            ElementBody::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn measure_mut(&mut self) -> Option<&mut MeasureData> {
        match &mut self.body {
            ElementBody::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn staff(&self) -> Option<&StaffData> {
        match &self.body {
            ElementBody::Staff(s) => Some(s),
            _ => None,
        }
    }

    pub fn layer(&self) -> Option<&LayerData> {
        match &self.body {
            ElementBody::Layer(l) => Some(l),
            _ => None,
        }
    }

    pub fn note(&self) -> Option<&NoteData> {
        match &self.body {
            ElementBody::Note(n) => Some(n),
            _ => None,
        }
    }

    pub fn note_mut(&mut self) -> Option<&mut NoteData> {
        match &mut self.body {
            ElementBody::Note(n) => Some(n),
            _ => None,
        }
    }

    pub fn ligature(&self) -> Option<&LigatureData> {
        match &self.body {
            ElementBody::Ligature(l) => Some(l),
            _ => None,
        }
    }

    pub fn ligature_mut(&mut self) -> Option<&mut LigatureData> {
        match &mut self.body {
            ElementBody::Ligature(l) => Some(l),
            _ => None,
        }
    }

    pub fn mrpt(&self) -> Option<&MRptData> {
        match &self.body {
            ElementBody::MRpt(m) => Some(m),
            _ => None,
        }
    }

    pub fn mrpt_mut(&mut self) -> Option<&mut MRptData> {
        match &mut self.body {
            ElementBody::MRpt(m) => Some(m),
            _ => None,
        }
    }

    pub fn control(&self) -> Option<&ControlElement> {
        match &self.body {
            ElementBody::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn control_mut(&mut self) -> Option<&mut ControlElement> {
        match &mut self.body {
            ElementBody::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn rend(&self) -> Option<&RendData> {
        match &self.body {
            ElementBody::Rend(r) => Some(r),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&TextData> {
        match &self.body {
            ElementBody::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.body {
            ElementBody::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<&SurfaceData> {
        match &self.body {
            ElementBody::Surface(s) => Some(s),
            _ => None,
        }
    }

    pub fn zone(&self) -> Option<&ZoneData> {
        match &self.body {
            ElementBody::Zone(z) => Some(z),
            _ => None,
        }
    }

    /// Clear everything a layout pass computes for this element.
    pub(crate) fn reset_drawing(&mut self) {
        match &mut self.body {
            ElementBody::System(system) => {
                system.aligner.reset();
                system.required_width = None;
            }
            ElementBody::Measure(measure) => measure.aligner.reset(),
            ElementBody::Note(note) => note.drawing_x_rel = 0,
            ElementBody::Ligature(ligature) => {
                ligature.drawing_shapes.clear();
                ligature.list = None;
            }
            ElementBody::MRpt(mrpt) => mrpt.drawing_measure_count = 0,
            ElementBody::Control(control) => control.reset(),
            _ => {}
        }
    }
}
