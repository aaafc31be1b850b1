// Corpus extraction: every MIDI file in a directory is flattened into a
// time-ordered list of tokens, and the lists are concatenated in path order.
// No boundary marker is inserted between files.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};
use midly::{MidiMessage, Smf, TrackEventKind};

use super::chord::Chord;
use super::error::{ConfigError, CorpusError};
use super::key::Note;
use super::token::Token;

pub const MIDI_EXTENSIONS: [&str; 2] = ["mid", "midi"];

/// General MIDI channel 10, which carries unpitched percussion.
const PERCUSSION_CHANNEL: u8 = 9;

/// A note starting at an absolute tick, tagged with the program of its channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Onset {
    tick: u64,
    program: Option<u8>,
    note: Note,
}

/// Extract the tokens of every MIDI file in `dir`.
///
/// A file that cannot be read or parsed is skipped with a warning. Only a
/// directory that cannot be listed is an error.
pub fn extract_tokens(dir: &Path) -> Result<Vec<Token>, ConfigError> {
    let files = midi_files(dir)?;
    info!("Found {} MIDI file(s) in {}", files.len(), dir.display());

    let mut tokens = Vec::new();
    for path in files {
        match file_tokens(&path) {
            Ok(file_tokens) => {
                debug!("{}: {} token(s)", path.display(), file_tokens.len());
                tokens.extend(file_tokens);
            }
            Err(err) => warn!("Skipping {}: {}", path.display(), err),
        }
    }
    Ok(tokens)
}

/// Files in `dir` with a MIDI extension, sorted by path.
pub fn midi_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let corpus_dir = |source: std::io::Error| ConfigError::CorpusDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(corpus_dir)? {
        let path = entry.map_err(corpus_dir)?.path();
        if path.is_file() && has_midi_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_midi_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MIDI_EXTENSIONS
                .iter()
                .any(|midi_ext| ext.eq_ignore_ascii_case(midi_ext))
        })
}

pub fn file_tokens(path: &Path) -> Result<Vec<Token>, CorpusError> {
    let data = fs::read(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let smf = Smf::parse(&data).map_err(|err| CorpusError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    smf_tokens(&smf)
}

/// Tokens for a parsed file: the first instrument part if the file names its
/// instruments, otherwise every pitched note in the file.
pub fn smf_tokens(smf: &Smf) -> Result<Vec<Token>, CorpusError> {
    let onsets = collect_onsets(smf);
    let selected = match partition_by_instrument(&onsets) {
        Ok(mut parts) => parts.swap_remove(0),
        Err(CorpusError::NoInstrumentMetadata) => {
            debug!("No instrument metadata, using all notes");
            onsets
        }
        Err(err) => return Err(err),
    };
    Ok(tokenize_onsets(&selected))
}

/// All pitched note onsets in the file, merged across tracks and sorted by tick.
fn collect_onsets(smf: &Smf) -> Vec<Onset> {
    // (tick, track, event) so that simultaneous events keep file order.
    let mut events = Vec::new();
    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut tick = 0u64;
        for (event_index, event) in track.iter().enumerate() {
            tick += u64::from(event.delta.as_int());
            if let TrackEventKind::Midi { channel, message } = event.kind {
                events.push((tick, track_index, event_index, channel.as_int(), message));
            }
        }
    }
    events.sort_by_key(|(tick, track, index, _, _)| (*tick, *track, *index));

    let mut programs: [Option<u8>; 16] = [None; 16];
    let mut onsets = Vec::new();
    for (tick, _, _, channel, message) in events {
        match message {
            MidiMessage::ProgramChange { program } => {
                programs[usize::from(channel)] = Some(program.as_int());
            }
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                if channel == PERCUSSION_CHANNEL {
                    continue;
                }
                onsets.push(Onset {
                    tick,
                    program: programs[usize::from(channel)],
                    note: Note(key.as_int()),
                });
            }
            _ => {}
        }
    }
    onsets
}

/// Split onsets into parts by program, in order of first appearance.
///
/// Notes heard before their channel's first program change belong to the
/// General MIDI default (program 0).
fn partition_by_instrument(onsets: &[Onset]) -> Result<Vec<Vec<Onset>>, CorpusError> {
    if onsets.iter().all(|onset| onset.program.is_none()) {
        return Err(CorpusError::NoInstrumentMetadata);
    }

    let mut parts: IndexMap<u8, Vec<Onset>> = IndexMap::new();
    for onset in onsets {
        parts
            .entry(onset.program.unwrap_or(0))
            .or_default()
            .push(*onset);
    }
    Ok(parts.into_values().collect())
}

/// Notes sharing a tick become one chord token, lone notes a pitch token.
fn tokenize_onsets(onsets: &[Onset]) -> Vec<Token> {
    onsets
        .chunk_by(|a, b| a.tick == b.tick)
        .map(|group| {
            let chord = Chord::new(group.iter().map(|onset| onset.note));
            match chord.notes() {
                [note] => Token::from(*note),
                _ => Token::from(&chord),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use midly::num::{u15, u28, u4, u7};
    use midly::{Format, Header, MetaMessage, Timing, Track, TrackEvent};

    /// One step of a synthetic track: wait `delta` ticks, then play `keys`
    /// together for a short while.
    pub(crate) struct Step<'a> {
        pub delta: u32,
        pub keys: &'a [u8],
    }

    pub(crate) fn track(channel: u8, program: Option<u8>, steps: &[Step]) -> Track<'static> {
        let midi = |delta: u32, message| TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(channel),
                message,
            },
        };

        let mut events = Vec::new();
        if let Some(program) = program {
            events.push(midi(
                0,
                MidiMessage::ProgramChange {
                    program: u7::new(program),
                },
            ));
        }
        for step in steps {
            for (i, key) in step.keys.iter().enumerate() {
                let delta = if i == 0 { step.delta } else { 0 };
                events.push(midi(
                    delta,
                    MidiMessage::NoteOn {
                        key: u7::new(*key),
                        vel: u7::new(100),
                    },
                ));
            }
            for (i, key) in step.keys.iter().enumerate() {
                let delta = if i == 0 { 10 } else { 0 };
                events.push(midi(
                    delta,
                    MidiMessage::NoteOff {
                        key: u7::new(*key),
                        vel: u7::new(0),
                    },
                ));
            }
        }
        events.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        events
    }

    pub(crate) fn smf_bytes(tracks: Vec<Track<'static>>) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(480)),
        ));
        smf.tracks = tracks;
        let mut buf = Vec::new();
        smf.write(&mut buf).unwrap();
        buf
    }

    fn tokens_of(tracks: Vec<Track<'static>>) -> Vec<String> {
        let bytes = smf_bytes(tracks);
        let smf = Smf::parse(&bytes).unwrap();
        smf_tokens(&smf).unwrap().iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn notes_and_chords_in_time_order() {
        let steps = [
            Step { delta: 0, keys: &[60] },
            Step { delta: 10, keys: &[60, 64, 67] },
            Step { delta: 10, keys: &[62] },
        ];
        assert_eq!(tokens_of(vec![track(0, None, &steps)]), ["C4", "0.4.7", "D4"]);
    }

    #[test]
    fn takes_first_instrument_part() {
        let piano = [Step { delta: 0, keys: &[60] }, Step { delta: 100, keys: &[62] }];
        let strings = [Step { delta: 50, keys: &[48] }];
        let tokens = tokens_of(vec![track(0, Some(0), &piano), track(1, Some(40), &strings)]);
        assert_eq!(tokens, ["C4", "D4"]);
    }

    #[test]
    fn without_programs_merges_every_track() {
        let upper = [Step { delta: 0, keys: &[72] }, Step { delta: 100, keys: &[74] }];
        let lower = [Step { delta: 50, keys: &[48] }];
        let tokens = tokens_of(vec![track(0, None, &upper), track(1, None, &lower)]);
        assert_eq!(tokens, ["C5", "C3", "D5"]);
    }

    #[test]
    fn file_without_notes_falls_back_to_nothing() {
        assert!(matches!(
            partition_by_instrument(&[]),
            Err(CorpusError::NoInstrumentMetadata)
        ));
        assert!(tokens_of(vec![track(0, Some(0), &[])]).is_empty());
    }

    #[test]
    fn skips_percussion() {
        let melody = [Step { delta: 0, keys: &[60] }];
        let drums = [Step { delta: 0, keys: &[36] }, Step { delta: 0, keys: &[38] }];
        let tokens = tokens_of(vec![track(0, None, &melody), track(PERCUSSION_CHANNEL, None, &drums)]);
        assert_eq!(tokens, ["C4"]);
    }

    #[test]
    fn walks_directory_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = smf_bytes(vec![track(0, None, &[Step { delta: 0, keys: &[60] }])]);
        let second = smf_bytes(vec![track(0, None, &[Step { delta: 0, keys: &[62] }])]);
        fs::write(dir.path().join("b.MID"), second).unwrap();
        fs::write(dir.path().join("a.mid"), first).unwrap();
        fs::write(dir.path().join("broken.mid"), b"not a midi file").unwrap();
        fs::write(dir.path().join("notes.txt"), b"C4 D4").unwrap();

        let tokens: Vec<String> = extract_tokens(dir.path())
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(tokens, ["C4", "D4"]);
    }

    #[test]
    fn empty_directory_gives_no_tokens() {
        let dir = tempfile::tempdir().unwrap();
        assert!(extract_tokens(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            extract_tokens(&missing),
            Err(ConfigError::CorpusDir { .. })
        ));
    }

    #[test]
    fn parse_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mid");
        fs::write(&path, b"not a midi file").unwrap();
        assert!(matches!(file_tokens(&path), Err(CorpusError::Parse { .. })));
    }
}
