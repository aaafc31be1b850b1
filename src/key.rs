// This module provides the following structs:
// Key: a key (one of the 12 semitones in Western tuning)
// Note: a note, with same values as MIDI (0 is C(-1), 60 is C4, etc.)
// NamedKey: a key that is called a certain way (e.g. D# or Eb).
// NamedNote: a note that is called a certain way (e.g. D#4 or Eb4).

// Display always spells with sharps and ASCII accidentals, since the output
// doubles as a vocabulary token. Parsing accepts the usual spellings.

use regex::Regex;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::TokenError;

static NAMED_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^([A-G])(##|x|𝄪|#|♯|b|♭)?$").unwrap());
static NAMED_NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^([A-G](?:##|x|𝄪|#|♯|b|♭)?)(-1|[0-9])$").unwrap());

pub const MAX_NOTE: u8 = 127;

// Represents any of the 12 distinct keys in Western tuning
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct Key(i8);

impl Key {
    pub fn new(key: i8) -> Self {
        Self(key.rem_euclid(12))
    }

    pub fn value(&self) -> u8 {
        // rem_euclid keeps this in 0..12
        self.0 as u8
    }

    pub fn get_default_named_key(&self) -> NamedKey {
        match self.0 {
            0 => NamedKey::new(BaseKey::C, KeyModifier::Natural),
            1 => NamedKey::new(BaseKey::C, KeyModifier::Sharp),
            2 => NamedKey::new(BaseKey::D, KeyModifier::Natural),
            3 => NamedKey::new(BaseKey::D, KeyModifier::Sharp),
            4 => NamedKey::new(BaseKey::E, KeyModifier::Natural),
            5 => NamedKey::new(BaseKey::F, KeyModifier::Natural),
            6 => NamedKey::new(BaseKey::F, KeyModifier::Sharp),
            7 => NamedKey::new(BaseKey::G, KeyModifier::Natural),
            8 => NamedKey::new(BaseKey::G, KeyModifier::Sharp),
            9 => NamedKey::new(BaseKey::A, KeyModifier::Natural),
            10 => NamedKey::new(BaseKey::A, KeyModifier::Sharp),
            _ => NamedKey::new(BaseKey::B, KeyModifier::Natural),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_default_named_key())
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// A wrapper around a note, with the height being the same as in MIDI
// (0 is C-1, 60 is C4 etc.)
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct Note(pub u8);

impl Note {
    /// Checked constructor from a MIDI note number.
    pub fn from_midi(value: i16) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_NOTE)
            .map(Self)
    }

    pub fn key(&self) -> Key {
        Key::new((self.0 % 12) as i8)
    }

    // Decompose a Note into its Key and octave
    pub fn decompose(&self) -> (Key, i8) {
        (self.key(), (self.0 / 12) as i8 - 1)
    }
}

impl Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, octave) = self.decompose();
        write!(f, "{}{}", key, octave)
    }
}

impl Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Note {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamedNote::from_str(s)?.to_note()
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum KeyModifier {
    Natural,
    Flat,
    Sharp,
    DoubleSharp,
}

impl KeyModifier {
    pub fn get_value(&self) -> i8 {
        match self {
            KeyModifier::Flat => -1,
            KeyModifier::Natural => 0,
            KeyModifier::Sharp => 1,
            KeyModifier::DoubleSharp => 2,
        }
    }
}

impl Display for KeyModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_modifier_str = match self {
            KeyModifier::Natural => "",
            KeyModifier::Flat => "b",
            KeyModifier::Sharp => "#",
            KeyModifier::DoubleSharp => "x",
        };
        write!(f, "{}", key_modifier_str)
    }
}

impl Debug for KeyModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum BaseKey {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl BaseKey {
    pub fn to_key(&self) -> Key {
        let key = match self {
            Self::C => 0,
            Self::D => 2,
            Self::E => 4,
            Self::F => 5,
            Self::G => 7,
            Self::A => 9,
            Self::B => 11,
        };
        Key::new(key)
    }
}

impl Display for BaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base_key_str = match self {
            BaseKey::C => "C",
            BaseKey::D => "D",
            BaseKey::E => "E",
            BaseKey::F => "F",
            BaseKey::G => "G",
            BaseKey::A => "A",
            BaseKey::B => "B",
        };
        write!(f, "{}", base_key_str)
    }
}

impl Debug for BaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NamedKey {
    pub base_key: BaseKey,
    pub key_modifier: KeyModifier,
}

impl NamedKey {
    pub fn new(base_key: BaseKey, key_modifier: KeyModifier) -> Self {
        NamedKey {
            base_key,
            key_modifier,
        }
    }
}

impl FromStr for NamedKey {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TokenError::InvalidNote(s.to_string());
        let captures = NAMED_KEY_RE.captures(s).ok_or_else(invalid)?;

        let base_key = match &captures[1] {
            "C" => BaseKey::C,
            "D" => BaseKey::D,
            "E" => BaseKey::E,
            "F" => BaseKey::F,
            "G" => BaseKey::G,
            "A" => BaseKey::A,
            "B" => BaseKey::B,
            _ => return Err(invalid()),
        };

        let key_modifier = match captures.get(2).map(|m| m.as_str()) {
            None => KeyModifier::Natural,
            Some("b" | "♭") => KeyModifier::Flat,
            Some("#" | "♯") => KeyModifier::Sharp,
            Some("x" | "𝄪" | "##") => KeyModifier::DoubleSharp,
            Some(_) => return Err(invalid()),
        };

        Ok(Self::new(base_key, key_modifier))
    }
}

impl Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base_key, self.key_modifier)
    }
}

impl Debug for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NamedNote {
    key: NamedKey,
    octave: i8,
}

impl NamedNote {
    pub fn new(key: NamedKey, octave: i8) -> Self {
        NamedNote { key, octave }
    }
    pub fn to_note(&self) -> Result<Note, TokenError> {
        // Do it this way to handle Cb5 is B4, B#4 is C5
        let value = i16::from(self.key.base_key.to_key().0)
            + i16::from(self.key.key_modifier.get_value())
            + (i16::from(self.octave) + 1) * 12;
        Note::from_midi(value).ok_or_else(|| TokenError::InvalidNote(self.to_string()))
    }
}

impl FromStr for NamedNote {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = NAMED_NOTE_RE
            .captures(s)
            .ok_or_else(|| TokenError::InvalidNote(s.to_string()))?;

        let key = NamedKey::from_str(&captures[1])?;
        let octave: i8 =
            str::parse(&captures[2]).map_err(|_| TokenError::InvalidNote(s.to_string()))?;

        Ok(Self::new(key, octave))
    }
}

impl Display for NamedNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.key, self.octave)
    }
}

impl Debug for NamedNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
