use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::ConfigError;
use super::generator::Decoder;
use super::reconstruct::{DEFAULT_DURATION, DEFAULT_OFFSET_STEP, DEFAULT_START_OFFSET};
use super::track::ticks;

pub const DEFAULT_CORPUS_DIR: &str = "MJ";
pub const DEFAULT_MODEL_PATH: &str = "model/final_model.json";
pub const DEFAULT_OUTPUT: &str = "output3.mid";
pub const DEFAULT_SEQUENCE_LENGTH: usize = 100;
pub const DEFAULT_HORIZON: usize = 500;

/// Settings for one generation run.
///
/// Every field can come from a JSON file; fields the file leaves out keep
/// their defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub corpus_dir: PathBuf,
    pub model_path: PathBuf,
    pub output: PathBuf,
    pub sequence_length: usize,
    pub horizon: usize,
    pub start_offset: f64,
    pub offset_step: f64,
    /// Fixes the choice of seed window (and sampling, if enabled).
    pub seed: Option<u64>,
    /// Switches from greedy decoding to sampling.
    pub temperature: Option<f32>,
    pub top_k: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from(DEFAULT_CORPUS_DIR),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT),
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            horizon: DEFAULT_HORIZON,
            start_offset: DEFAULT_START_OFFSET,
            offset_step: DEFAULT_OFFSET_STEP,
            seed: None,
            temperature: None,
            top_k: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file_error = |message: String| ConfigError::File {
            path: path.to_path_buf(),
            message,
        };
        let json = fs::read_to_string(path).map_err(|err| file_error(err.to_string()))?;
        serde_json::from_str(&json).map_err(|err| file_error(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Invalid(message.to_string()));
        if self.sequence_length == 0 {
            return invalid("sequence_length must be positive");
        }
        if self.horizon == 0 {
            return invalid("horizon must be positive");
        }
        if !self.start_offset.is_finite() || self.start_offset < 0.0 {
            return invalid("start_offset must be a non-negative number");
        }
        if !self.offset_step.is_finite() || self.offset_step <= 0.0 {
            return invalid("offset_step must be a positive number");
        }
        let last_release =
            self.start_offset + self.offset_step * (self.horizon - 1) as f64 + DEFAULT_DURATION;
        if ticks(last_release).is_err() {
            return invalid("start_offset and offset_step place notes past the last MIDI tick");
        }
        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || temperature <= 0.0 {
                return invalid("temperature must be a positive number");
            }
        }
        if self.top_k == Some(0) {
            return invalid("top_k must be at least 1");
        }
        if self.top_k.is_some() && self.temperature.is_none() {
            return invalid("top_k only applies when sampling with a temperature");
        }
        Ok(())
    }

    pub fn decoder(&self) -> Decoder {
        match self.temperature {
            Some(temperature) => Decoder::Temperature {
                temperature,
                top_k: self.top_k,
            },
            None => Decoder::Greedy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.corpus_dir, PathBuf::from("MJ"));
        assert_eq!(config.output, PathBuf::from("output3.mid"));
        assert_eq!(config.sequence_length, 100);
        assert_eq!(config.horizon, 500);
        assert_eq!(config.start_offset, 2.0);
        assert_eq!(config.offset_step, 0.5);
        assert_eq!(config.decoder(), Decoder::Greedy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_overrides_some_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("melodist.json");
        fs::write(
            &path,
            r#"{ "corpus_dir": "midi/bach", "horizon": 64, "temperature": 0.8, "top_k": 5 }"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.corpus_dir, PathBuf::from("midi/bach"));
        assert_eq!(config.horizon, 64);
        assert_eq!(config.sequence_length, 100);
        assert_eq!(
            config.decoder(),
            Decoder::Temperature {
                temperature: 0.8,
                top_k: Some(5)
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("melodist.json");
        fs::write(&path, r#"{ "sequence_lenght": 50 }"#).unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::File { .. })
        ));
    }

    #[test]
    fn validation() {
        let cases = [
            Config {
                sequence_length: 0,
                ..Config::default()
            },
            Config {
                horizon: 0,
                ..Config::default()
            },
            Config {
                offset_step: 0.0,
                ..Config::default()
            },
            Config {
                start_offset: f64::NAN,
                ..Config::default()
            },
            Config {
                temperature: Some(-1.0),
                ..Config::default()
            },
            Config {
                top_k: Some(3),
                ..Config::default()
            },
            Config {
                temperature: Some(1.0),
                top_k: Some(0),
                ..Config::default()
            },
            Config {
                offset_step: 600_000.0,
                ..Config::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn offsets_must_fit_in_midi_ticks() {
        // 2 + 3 * 100000 + 1 quarters is 144_001_440 ticks, below 2^28.
        let fits = Config {
            horizon: 4,
            offset_step: 100_000.0,
            ..Config::default()
        };
        assert!(fits.validate().is_ok());

        let too_far = Config {
            horizon: 3,
            offset_step: 600_000.0,
            ..Config::default()
        };
        assert!(matches!(too_far.validate(), Err(ConfigError::Invalid(_))));
    }
}
