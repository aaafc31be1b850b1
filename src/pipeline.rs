// The whole batch job: corpus → vocabulary → windows → model → generated
// tokens → MIDI file. Nothing is persisted except the output file.

use std::path::PathBuf;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::Config;
use super::corpus::extract_tokens;
use super::dataset::Dataset;
use super::error::{ConfigError, Result};
use super::generator::Generator;
use super::model::{DenseModel, Predictor};
use super::reconstruct::Reconstructor;
use super::token::Token;
use super::track::write_midi;
use super::vocab::Vocabulary;

/// The preprocessed corpus, ready to seed generation.
#[derive(Clone, Debug)]
pub struct Prepared {
    pub tokens: Vec<Token>,
    pub vocab: Vocabulary,
    pub dataset: Dataset,
}

#[derive(Clone, Debug)]
pub struct Summary {
    pub corpus_tokens: usize,
    pub vocabulary_size: usize,
    pub windows: usize,
    pub generated: Vec<Token>,
    pub output: PathBuf,
}

/// Extract the corpus and build the vocabulary and windows.
pub fn prepare(config: &Config) -> Result<Prepared> {
    let tokens = extract_tokens(&config.corpus_dir)?;
    let vocab = Vocabulary::build(&tokens)?;
    let dataset = Dataset::build(&tokens, &vocab, config.sequence_length)?;
    info!(
        "Preprocessing complete: {} token(s), vocabulary of {}, {} window(s)",
        tokens.len(),
        vocab.len(),
        dataset.len()
    );
    Ok(Prepared {
        tokens,
        vocab,
        dataset,
    })
}

/// Generate tokens with any predictor and write them out as MIDI.
pub fn compose<P: Predictor + ?Sized>(
    config: &Config,
    prepared: &Prepared,
    model: &P,
) -> Result<Vec<Token>> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let generated = Generator::new(model, &prepared.vocab, config.horizon)
        .with_decoder(config.decoder())
        .generate(&prepared.dataset, &mut rng)?;

    let events = Reconstructor::new(config.start_offset, config.offset_step).events(&generated)?;
    write_midi(&events, &config.output)?;
    info!("MIDI file generated: {}", config.output.display());
    Ok(generated)
}

pub fn run(config: &Config) -> Result<Summary> {
    config.validate()?;

    // Fail before spending time on the corpus.
    if !config.model_path.is_file() {
        return Err(ConfigError::ModelNotFound(config.model_path.clone()).into());
    }

    let prepared = prepare(config)?;

    let model = DenseModel::load(&config.model_path)?;
    if model.sequence_length() != config.sequence_length {
        return Err(ConfigError::SequenceLengthMismatch {
            model: model.sequence_length(),
            configured: config.sequence_length,
        }
        .into());
    }
    if model.n_vocab() != prepared.vocab.len() {
        return Err(ConfigError::VocabularyMismatch {
            model: model.n_vocab(),
            corpus: prepared.vocab.len(),
        }
        .into());
    }

    let generated = compose(config, &prepared, &model)?;
    Ok(Summary {
        corpus_tokens: prepared.tokens.len(),
        vocabulary_size: prepared.vocab.len(),
        windows: prepared.dataset.len(),
        generated,
        output: config.output.clone(),
    })
}
