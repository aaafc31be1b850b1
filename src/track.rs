use std::path::Path;

use log::info;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use super::error::{Error, MidiWriteError};
use super::reconstruct::MidiEvent;

pub const TICKS_PER_BEAT: u16 = 480;
const TEMPO_120_BPM: u32 = 500_000;
const VELOCITY: u8 = 100;

/// Absolute tick of an offset in quarter notes. Delta times are 28-bit, so an
/// absolute tick that fits keeps every delta in range too.
pub fn ticks(quarters: f64) -> Result<u32, MidiWriteError> {
    let tick = (quarters * f64::from(TICKS_PER_BEAT)).round().max(0.0);
    if !tick.is_finite() || tick > f64::from(u28::max_value().as_int()) {
        return Err(MidiWriteError::TickOverflow { offset: quarters });
    }
    Ok(tick as u32)
}

/// Create a track of MIDI events from timed notes and chords.
///
/// Everything goes on channel 0; a program change is emitted whenever the
/// instrument differs from the previous event's. Fails if an event lies
/// beyond the last representable tick.
pub fn create_track<'a>(events: &[MidiEvent]) -> Result<Vec<TrackEvent<'a>>, MidiWriteError> {
    let midi = |message| TrackEventKind::Midi {
        channel: u4::new(0),
        message,
    };

    // (tick, note-offs before note-ons, insertion order, event)
    let mut timed: Vec<(u32, u8, usize, TrackEventKind<'a>)> = Vec::new();
    let mut program = None;
    for event in events {
        let start = ticks(event.offset)?;
        let end = ticks(event.offset + event.duration)?;

        if program != Some(event.instrument.program) {
            program = Some(event.instrument.program);
            let change = MidiMessage::ProgramChange {
                program: u7::new(event.instrument.program),
            };
            timed.push((start, 1, timed.len(), midi(change)));
        }

        for note in event.notes() {
            let on = MidiMessage::NoteOn {
                key: u7::new(note.0),
                vel: u7::new(VELOCITY),
            };
            timed.push((start, 2, timed.len(), midi(on)));
            let off = MidiMessage::NoteOff {
                key: u7::new(note.0),
                vel: u7::new(0),
            };
            timed.push((end, 0, timed.len(), midi(off)));
        }
    }
    timed.sort_by_key(|(tick, rank, order, _)| (*tick, *rank, *order));

    let mut track_events = Vec::<TrackEvent>::with_capacity(timed.len() + 2);

    // Set tempo to 120 bpm
    track_events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(TEMPO_120_BPM))),
    });

    let mut last_tick = 0;
    for (tick, _, _, kind) in timed {
        track_events.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind,
        });
        last_tick = tick;
    }

    // Track end
    track_events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(track_events)
}

pub fn create_smf<'a>(events: &[MidiEvent]) -> Result<Smf<'a>, MidiWriteError> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));
    smf.tracks.push(create_track(events)?);
    Ok(smf)
}

/// Serialize `events` as a single-track MIDI file at `path`.
pub fn write_midi(events: &[MidiEvent], path: &Path) -> Result<(), Error> {
    create_smf(events)?
        .save(path)
        .map_err(|source| MidiWriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Wrote {} event(s) to {}", events.len(), path.display());
    Ok(())
}
