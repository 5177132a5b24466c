//! Transposition of harmony labels.
//!
//! A label such as `G#m7/F#` carries a root pitch at the start of its text
//! and an optional bass pitch after the `/`. Both are rewritten in place;
//! the rest of the label is kept as written.

use crate::document::Document;
use crate::functor::{Functor, FunctorCode};
use crate::model::{ElementId, ElementKind, Pname};

/// Spelled pitch as used by the transposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransPitch {
    pub pname: Pname,
    /// Chromatic alteration in semitones, negative for flats.
    pub accid: i32,
    pub oct: i32,
}

impl TransPitch {
    pub fn new(pname: Pname, accid: i32, oct: i32) -> Self {
        Self { pname, accid, oct }
    }

    /// Semitones from C0.
    pub fn semitones(&self) -> i32 {
        self.oct * 12 + self.pname.semitone() + self.accid
    }

    /// Letter followed by its accidentals. Double accidentals use their own
    /// glyph.
    pub fn pitch_string(&self) -> String {
        let mut out = String::new();
        out.push(self.pname.letter());
        let (single, double) = if self.accid < 0 { ('♭', '𝄫') } else { ('♯', '𝄪') };
        let count = self.accid.unsigned_abs();
        for _ in 0..count / 2 {
            out.push(double);
        }
        if count % 2 == 1 {
            out.push(single);
        }
        out
    }
}

/// Parse a pitch starting at char index `pos` of `text`. Returns the pitch
/// and the char index right after it.
fn parse_pitch(text: &str, pos: usize) -> Option<(TransPitch, usize)> {
    let mut chars = text.chars().skip(pos).peekable();
    let pname = chars.next().and_then(Pname::from_letter)?;
    let mut accid = 0;
    let mut end = pos + 1;
    while let Some(&c) = chars.peek() {
        match c {
            '𝄫' => accid -= 2,
            'b' | '♭' => accid -= 1,
            '#' | '♯' => accid += 1,
            '𝄪' => accid += 2,
            _ => break,
        }
        chars.next();
        end += 1;
    }
    Some((TransPitch::new(pname, accid, 4), end))
}

// ═══════════════════════════════════════════════════════════════════════
// Transposers
// ═══════════════════════════════════════════════════════════════════════

pub trait Transposer {
    fn transpose(&self, pitch: &mut TransPitch);
}

/// Moves pitches by a fixed interval, keeping the spelling: the letter moves
/// by `diatonic` steps and the accidental absorbs the rest of `chromatic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTransposer {
    pub diatonic: i32,
    pub chromatic: i32,
}

impl IntervalTransposer {
    pub fn new(diatonic: i32, chromatic: i32) -> Self {
        Self {
            diatonic,
            chromatic,
        }
    }
}

impl Transposer for IntervalTransposer {
    fn transpose(&self, pitch: &mut TransPitch) {
        let target = pitch.semitones() + self.chromatic;
        let step = pitch.pname.step() + self.diatonic;
        let oct = pitch.oct + step.div_euclid(7);
        let pname = Pname::from_step(step);
        let natural = TransPitch::new(pname, 0, oct).semitones();
        *pitch = TransPitch::new(pname, target - natural, oct);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Harmony labels
// ═══════════════════════════════════════════════════════════════════════

impl Document {
    /// Text child holding the label content.
    fn harm_text(&self, harm: ElementId) -> Option<ElementId> {
        if self.kind(harm) != Some(ElementKind::Harm) {
            return None;
        }
        self.find_descendant_by_kind(harm, ElementKind::Text, Some(1))
    }

    fn harm_label(&self, harm: ElementId) -> Option<String> {
        let text = self.harm_text(harm)?;
        Some(self.get(text)?.text()?.text.clone())
    }

    fn set_harm_label(&mut self, harm: ElementId, label: String) {
        let Some(text) = self.harm_text(harm) else {
            return;
        };
        if let Some(text) = self.get_mut(text).and_then(|e| e.text_mut()) {
            text.text = label;
        }
    }

    /// Root pitch of a harmony label, read at char index `pos`. Returns the
    /// pitch and the index right after it.
    pub fn harm_root_pitch(&self, harm: ElementId, pos: usize) -> Option<(TransPitch, usize)> {
        let label = self.harm_label(harm)?;
        let pitch = parse_pitch(&label, pos);
        if pitch.is_none() {
            log::warn!("Failed to extract a pitch from harm label '{label}'");
        }
        pitch
    }

    /// Replace the root pitch ending at char index `end`.
    pub fn set_harm_root_pitch(&mut self, harm: ElementId, pitch: &TransPitch, end: usize) {
        let Some(label) = self.harm_label(harm) else {
            return;
        };
        let rest: String = label.chars().skip(end).collect();
        self.set_harm_label(harm, pitch.pitch_string() + &rest);
    }

    /// Bass pitch written after the first `/`.
    pub fn harm_bass_pitch(&self, harm: ElementId) -> Option<TransPitch> {
        let label = self.harm_label(harm)?;
        let slash = label.chars().position(|c| c == '/')?;
        self.harm_root_pitch(harm, slash + 1).map(|(pitch, _)| pitch)
    }

    /// Replace everything after the first `/` with `pitch`, adding the
    /// slash when missing.
    pub fn set_harm_bass_pitch(&mut self, harm: ElementId, pitch: &TransPitch) {
        let Some(label) = self.harm_label(harm) else {
            return;
        };
        let head: String = label.chars().take_while(|&c| c != '/').collect();
        self.set_harm_label(harm, format!("{head}/{}", pitch.pitch_string()));
    }
}

/// Transposes the root and the bass of every harmony label.
pub struct Transpose<'a> {
    transposer: &'a dyn Transposer,
}

impl<'a> Transpose<'a> {
    pub fn new(transposer: &'a dyn Transposer) -> Self {
        Self { transposer }
    }
}

impl Functor for Transpose<'_> {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        if doc.kind(id) != Some(ElementKind::Harm) {
            return FunctorCode::Continue;
        }
        if let Some((mut pitch, end)) = doc.harm_root_pitch(id, 0) {
            self.transposer.transpose(&mut pitch);
            doc.set_harm_root_pitch(id, &pitch, end);
        }
        // The bass of "G#m7/F#"
        if let Some(mut pitch) = doc.harm_bass_pitch(id) {
            self.transposer.transpose(&mut pitch);
            doc.set_harm_bass_pitch(id, &pitch);
        }
        FunctorCode::Siblings
    }
}

pub fn transpose(doc: &mut Document, transposer: &dyn Transposer) {
    doc.process(&mut Transpose::new(transposer));
}
