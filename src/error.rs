use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning one MIDI file into tokens.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse MIDI file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    // Recoverable: the extractor falls back to the flattened view.
    #[error("no instrument metadata")]
    NoInstrumentMetadata,
}

/// Fatal problems with the run's inputs. None of these are retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("model file not found at {0}")]
    ModelNotFound(PathBuf),

    #[error("corpus directory {path} could not be listed: {source}")]
    CorpusDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("degenerate vocabulary: corpus yielded {0} distinct token(s), need at least 2")]
    DegenerateVocabulary(usize),

    #[error("corpus too short: {tokens} token(s) for a sequence length of {sequence_length}")]
    CorpusTooShort {
        tokens: usize,
        sequence_length: usize,
    },

    #[error("model expects a vocabulary of {model} but the corpus has {corpus}")]
    VocabularyMismatch { model: usize, corpus: usize },

    #[error("model expects windows of {model} but sequence length is {configured}")]
    SequenceLengthMismatch { model: usize, configured: usize },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not read config file {path}: {message}")]
    File { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("could not read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact: {0}")]
    Format(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Shape(String),

    #[error("model input has {actual} values, expected {expected}")]
    InputSize { expected: usize, actual: usize },

    #[error("model returned {actual} probabilities for a vocabulary of {expected}")]
    OutputSize { expected: usize, actual: usize },

    #[error("model returned no usable probabilities")]
    NoFiniteScores,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid note: {0}")]
    InvalidNote(String),

    #[error("invalid chord component {component:?} in token {token:?}")]
    InvalidChordComponent { token: String, component: String },

    #[error("token {0:?} is not in the vocabulary")]
    UnknownToken(String),

    #[error("index {0} is not in the vocabulary")]
    UnknownIndex(usize),
}

#[derive(Error, Debug)]
pub enum MidiWriteError {
    #[error("could not write MIDI file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("offset {offset} quarter notes is past the last representable MIDI tick")]
    TickOverflow { offset: f64 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    MidiWrite(#[from] MidiWriteError),
}

pub type Result<T> = std::result::Result<T, Error>;
