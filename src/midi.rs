//! MIDI event extraction from the element tree.
//!
//! Only pitch and duration are read: ligature shapes and layout results do
//! not affect the output. Each staff gets its own channel and track; every
//! layer of a measure starts at the measure's first tick.
//!
//! [`to_smf`] packs the events as a Standard MIDI File (SMF) Type 1.

use std::collections::BTreeMap;

use crate::document::Document;
use crate::functor::{Functor, FunctorCode};
use crate::model::{ElementId, ElementKind};

// ═══════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════

/// A single MIDI event (note on/off, program change, etc.)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiEvent {
    /// Absolute time in ticks from the start of the track
    pub tick: u32,
    /// Raw MIDI message bytes (status + data)
    pub bytes: Vec<u8>,
}

/// Ticks per quarter note in our MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

const NOTE_VELOCITY: u8 = 80;

/// Collects note events, keyed by staff number.
#[derive(Debug, Default)]
pub struct GenerateMidi {
    measure_start: u32,
    /// Furthest tick reached by any layer of the current measure.
    measure_end: u32,
    /// Lengths of the two measures before the current one, oldest first.
    previous_spans: [u32; 2],
    layer_tick: u32,
    staff_n: i32,
    tracks: BTreeMap<i32, Vec<MidiEvent>>,
}

impl GenerateMidi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events per staff number, sorted by tick.
    pub fn into_tracks(self) -> BTreeMap<i32, Vec<MidiEvent>> {
        let mut tracks = self.tracks;
        for events in tracks.values_mut() {
            events.sort_by_key(|e| e.tick);
        }
        tracks
    }

    fn channel(&self) -> u8 {
        // Channel 9 is reserved for drums.
        match (self.staff_n - 1).clamp(0, 14) as u8 {
            c if c >= 9 => c + 1,
            c => c,
        }
    }

    fn visit_note(&mut self, doc: &Document, id: ElementId) {
        let Some(note) = doc.get(id).and_then(|e| e.note()) else {
            return;
        };
        let duration = (note.dur.quarters() * TICKS_PER_QUARTER as f64) as u32;
        let pitch = note.midi_pitch().clamp(0, 127) as u8;
        let channel = self.channel();

        let track = self.tracks.entry(self.staff_n).or_default();
        track.push(MidiEvent {
            tick: self.layer_tick,
            bytes: vec![0x90 | channel, pitch, NOTE_VELOCITY],
        });
        track.push(MidiEvent {
            tick: self.layer_tick + duration,
            bytes: vec![0x80 | channel, pitch, 0],
        });
        self.layer_tick += duration;
        self.measure_end = self.measure_end.max(self.layer_tick);
    }
}

impl Functor for GenerateMidi {
    fn visit(&mut self, doc: &mut Document, id: ElementId) -> FunctorCode {
        let Some(kind) = doc.kind(id) else {
            return FunctorCode::Siblings;
        };
        match kind {
            ElementKind::Measure => {
                let span = self.measure_end - self.measure_start;
                self.previous_spans = [self.previous_spans[1], span];
                self.measure_start = self.measure_end;
                FunctorCode::Continue
            }
            ElementKind::Staff => {
                self.staff_n = doc.get(id).and_then(|e| e.staff()).map_or(1, |s| s.n);
                FunctorCode::Continue
            }
            ElementKind::Layer => {
                self.layer_tick = self.measure_start;
                FunctorCode::Continue
            }
            ElementKind::Note => {
                self.visit_note(doc, id);
                FunctorCode::Siblings
            }
            ElementKind::MRpt | ElementKind::MRpt2 => {
                log::warn!("{kind} produces empty MIDI output");
                // Silent, but as long as the measures it repeats.
                let [before, last] = self.previous_spans;
                let span = if kind == ElementKind::MRpt2 { before + last } else { last };
                self.measure_end = self.measure_end.max(self.measure_start + span);
                FunctorCode::Continue
            }
            k if k.is_control_element() => FunctorCode::Siblings,
            _ => FunctorCode::Continue,
        }
    }
}

/// Note events of the whole document, one list per staff number.
pub fn generate_midi(doc: &mut Document) -> BTreeMap<i32, Vec<MidiEvent>> {
    let mut functor = GenerateMidi::new();
    doc.process(&mut functor);
    functor.into_tracks()
}

/// Pack per-staff events into a Standard MIDI File. Track names are
/// `Staff <n>`.
pub fn to_smf(tracks: &BTreeMap<i32, Vec<MidiEvent>>) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = tracks
        .iter()
        .map(|(n, events)| encode_track(events, &format!("Staff {n}")))
        .collect();
    build_smf(&encoded)
}

// ═══════════════════════════════════════════════════════════════════════
// SMF byte encoding
// ═══════════════════════════════════════════════════════════════════════

/// Build the complete Standard MIDI File bytes.
fn build_smf(tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();

    // MThd header
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes()); // header length
    out.extend_from_slice(&1u16.to_be_bytes()); // format type 1
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());

    for track_data in tracks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        out.extend_from_slice(track_data);
    }

    out
}

/// Encode a track's events into raw MTrk bytes (delta-time encoded).
fn encode_track(events: &[MidiEvent], name: &str) -> Vec<u8> {
    let mut data = Vec::new();

    // Track name meta event
    let name_bytes = name.as_bytes();
    data.push(0x00);
    data.push(0xFF);
    data.push(0x03);
    write_vlq(&mut data, name_bytes.len() as u32);
    data.extend_from_slice(name_bytes);

    let mut sorted: Vec<&MidiEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.tick);

    let mut last_tick: u32 = 0;
    for event in &sorted {
        write_vlq(&mut data, event.tick.saturating_sub(last_tick));
        data.extend_from_slice(&event.bytes);
        last_tick = event.tick;
    }

    // End of track
    data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    data
}

/// Write a variable-length quantity (VLQ) to a byte vector.
fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    let mut buf = [0u8; 5];
    let mut i = 0;
    loop {
        buf[i] = (value & 0x7F) as u8;
        if i > 0 {
            buf[i] |= 0x80;
        }
        value >>= 7;
        i += 1;
        if value == 0 {
            break;
        }
    }
    out.extend(buf[..i].iter().rev());
}
