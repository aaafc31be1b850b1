use log::debug;

use super::error::TokenError;
use super::key::Note;
use super::token::{Pitched, Token};

pub const DEFAULT_START_OFFSET: f64 = 2.0;
pub const DEFAULT_OFFSET_STEP: f64 = 0.5;

/// Quarter notes each note sounds for.
pub const DEFAULT_DURATION: f64 = 1.0;

/// A General MIDI timbre.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instrument {
    pub name: &'static str,
    pub program: u8,
}

impl Instrument {
    pub const PIANO: Instrument = Instrument {
        name: "Piano",
        program: 0,
    };
}

/// One note or chord placed in time. Offsets and durations are in quarter notes.
#[derive(Clone, Debug, PartialEq)]
pub struct MidiEvent {
    pub offset: f64,
    pub duration: f64,
    pub pitched: Pitched,
    pub instrument: Instrument,
}

impl MidiEvent {
    pub fn notes(&self) -> &[Note] {
        match &self.pitched {
            Pitched::Note(note) => std::slice::from_ref(note),
            Pitched::Chord(chord) => chord.notes(),
        }
    }
}

/// Turns generated tokens back into timed events, one per token, spaced
/// evenly whether they are notes or chords.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reconstructor {
    start_offset: f64,
    offset_step: f64,
    instrument: Instrument,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_START_OFFSET, DEFAULT_OFFSET_STEP)
    }
}

impl Reconstructor {
    pub fn new(start_offset: f64, offset_step: f64) -> Self {
        Self {
            start_offset,
            offset_step,
            instrument: Instrument::PIANO,
        }
    }

    /// Event `i` sits at `start_offset + offset_step * i`.
    pub fn offset(&self, position: usize) -> f64 {
        self.start_offset + self.offset_step * position as f64
    }

    pub fn events(&self, tokens: &[Token]) -> Result<Vec<MidiEvent>, TokenError> {
        let events = tokens
            .iter()
            .enumerate()
            .map(|(position, token)| {
                Ok(MidiEvent {
                    offset: self.offset(position),
                    duration: DEFAULT_DURATION,
                    pitched: token.to_pitched()?,
                    instrument: self.instrument,
                })
            })
            .collect::<Result<Vec<MidiEvent>, TokenError>>()?;
        debug!(
            "Reconstructed {} event(s) for {}",
            events.len(),
            self.instrument.name
        );
        Ok(events)
    }
}
