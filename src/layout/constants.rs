//! Shared constants for the layout passes (drawing units unless noted).

// ── Units ───────────────────────────────────────────────────────────
pub(super) const DEFINITION_FACTOR: i32 = 10; // option unit -> drawing unit
pub(super) const DEFAULT_STAFF_SIZE: i32 = 100; // percent

// ── Harmony spacing ─────────────────────────────────────────────────
pub(super) const HARM_WORD_SPACE_UNITS: i32 = 2; // gap kept between two labels of a group

// ── Ligatures ───────────────────────────────────────────────────────
pub(super) const LIGATURE_STACK_THRESHOLD: i32 = 1; // stack a final longa from a third
pub(super) const LIGATURE_STACK_THRESHOLD_AFTER_OBLIQUE: i32 = 2; // ... from a fourth after an oblique
pub(super) const LIGATURE_OBLIQUE_MAX_STEP: i32 = 2; // wider oblique intervals are shifted right
