// Tokens are the vocabulary unit: a pitch name such as "C#4" for a single
// note, or a chord's normal order joined by dots such as "0.4.7".

use std::fmt::{self, Display};

use log::warn;

use super::chord::Chord;
use super::error::TokenError;
use super::key::{Note, MAX_NOTE};

pub const CHORD_SEPARATOR: char = '.';

/// Chord components below 12 are pitch classes and sound in this octave.
pub const PITCH_CLASS_OCTAVE: i8 = 4;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(String);

/// What a token decodes to when it is played back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pitched {
    Note(Note),
    Chord(Chord),
}

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chords contain a separator or are purely numeric (a one-class chord).
    pub fn is_chord(&self) -> bool {
        self.0.contains(CHORD_SEPARATOR)
            || (!self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit()))
    }

    pub fn to_pitched(&self) -> Result<Pitched, TokenError> {
        if self.is_chord() {
            let notes = self
                .0
                .split(CHORD_SEPARATOR)
                .map(|component| self.chord_component(component))
                .collect::<Result<Vec<Note>, TokenError>>()?;
            Ok(Pitched::Chord(Chord::new(notes)))
        } else {
            Ok(Pitched::Note(self.0.parse()?))
        }
    }

    fn chord_component(&self, component: &str) -> Result<Note, TokenError> {
        let value: u32 = component
            .parse()
            .map_err(|_| TokenError::InvalidChordComponent {
                token: self.0.clone(),
                component: component.to_string(),
            })?;
        Ok(chord_note(value))
    }
}

/// Maps a chord component to a playable note.
///
/// 0..=11 are pitch classes placed in octave 4, 12..=127 are MIDI numbers,
/// anything higher is folded down by octaves until it fits.
pub fn chord_note(value: u32) -> Note {
    let max = u32::from(MAX_NOTE);
    let folded = if value < 12 {
        value + (PITCH_CLASS_OCTAVE as u32 + 1) * 12
    } else if value <= max {
        value
    } else {
        let octaves = (value - max).div_ceil(12);
        let folded = value - octaves * 12;
        warn!("Chord component {} is above the MIDI range, using {}", value, folded);
        folded
    };
    Note(folded as u8)
}

impl From<Note> for Token {
    fn from(note: Note) -> Self {
        Self(note.to_string())
    }
}

impl From<&Chord> for Token {
    fn from(chord: &Chord) -> Self {
        let classes: Vec<String> = chord
            .normal_order()
            .into_iter()
            .map(|class| class.to_string())
            .collect();
        Self(classes.join(&CHORD_SEPARATOR.to_string()))
    }
}

impl From<&str> for Token {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
