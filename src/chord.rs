use super::key::Note;

/// A set of simultaneous notes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chord {
    notes: Vec<Note>,
}

impl Chord {
    /// Notes are kept sorted and deduplicated.
    pub fn new(notes: impl IntoIterator<Item = Note>) -> Self {
        let mut notes: Vec<Note> = notes.into_iter().collect();
        notes.sort();
        notes.dedup();
        Self { notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Distinct pitch classes in ascending order.
    pub fn pitch_classes(&self) -> Vec<u8> {
        let mut classes: Vec<u8> = self.notes.iter().map(|note| note.key().value()).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    pub fn normal_order(&self) -> Vec<u8> {
        normal_order(&self.pitch_classes())
    }
}

/// Most compact rotation of a sorted, distinct pitch-class set.
///
/// Rotations are compared by the span from the first element to the last,
/// then to the second-to-last, and so on. Remaining ties go to the rotation
/// starting on the lowest pitch class.
pub fn normal_order(pitch_classes: &[u8]) -> Vec<u8> {
    let len = pitch_classes.len();
    if len < 2 {
        return pitch_classes.to_vec();
    }

    let rotation = |start: usize| -> Vec<u8> {
        pitch_classes[start..]
            .iter()
            .chain(&pitch_classes[..start])
            .copied()
            .collect()
    };
    let spans = |candidate: &[u8]| -> Vec<u8> {
        (1..len)
            .rev()
            .map(|i| (candidate[i] + 12 - candidate[0]) % 12)
            .collect()
    };

    let mut best = rotation(0);
    let mut best_spans = spans(&best);
    for start in 1..len {
        let candidate = rotation(start);
        let candidate_spans = spans(&candidate);
        if candidate_spans < best_spans {
            best = candidate;
            best_spans = candidate_spans;
        }
    }
    best
}
