//! Generate melodies from a folder of MIDI files.
//!
//! The corpus is flattened into pitch and chord tokens, a fixed-length window
//! of token indices is fed to a predictive model one step at a time, and the
//! resulting tokens are written back out as a MIDI file.

pub mod chord;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod key;
pub mod model;
pub mod pipeline;
pub mod reconstruct;
pub mod token;
pub mod track;
pub mod vocab;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{run, Summary};
