use super::error::{ConfigError, Result};
use super::model::Tensor;
use super::token::Token;
use super::vocab::Vocabulary;

/// Fixed-length windows over the encoded corpus, each paired with the index
/// of the token that follows it.
#[derive(Clone, Debug)]
pub struct Dataset {
    sequence_length: usize,
    n_vocab: usize,
    windows: Vec<Vec<usize>>,
    targets: Vec<usize>,
}

impl Dataset {
    /// Slide a window of `sequence_length` over `tokens`.
    ///
    /// A corpus of `L` tokens gives `L - sequence_length` windows. A corpus
    /// with no more tokens than the window length gives none, which is an
    /// error since generation needs a seed window.
    pub fn build(tokens: &[Token], vocab: &Vocabulary, sequence_length: usize) -> Result<Self> {
        if sequence_length == 0 {
            return Err(ConfigError::Invalid("sequence length must be positive".to_string()).into());
        }
        if tokens.len() <= sequence_length {
            return Err(ConfigError::CorpusTooShort {
                tokens: tokens.len(),
                sequence_length,
            }
            .into());
        }

        let encoded = tokens
            .iter()
            .map(|token| vocab.encode(token))
            .collect::<std::result::Result<Vec<usize>, _>>()?;

        let (windows, targets): (Vec<Vec<usize>>, Vec<usize>) = encoded
            .windows(sequence_length + 1)
            .map(|chunk| (chunk[..sequence_length].to_vec(), chunk[sequence_length]))
            .unzip();

        Ok(Self {
            sequence_length,
            n_vocab: vocab.len(),
            windows,
            targets,
        })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn n_vocab(&self) -> usize {
        self.n_vocab
    }

    pub fn windows(&self) -> &[Vec<usize>] {
        &self.windows
    }

    pub fn window(&self, index: usize) -> Option<&[usize]> {
        self.windows.get(index).map(Vec::as_slice)
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// All windows as one (patterns, sequence_length, 1) tensor, each index
    /// divided by the vocabulary size.
    pub fn normalized(&self) -> Tensor {
        let data = self
            .windows
            .iter()
            .flat_map(|window| normalize(window, self.n_vocab))
            .collect();
        Tensor::new([self.windows.len(), self.sequence_length, 1], data)
    }
}

pub fn normalize(window: &[usize], n_vocab: usize) -> Vec<f32> {
    let n_vocab = n_vocab.max(1) as f32;
    window.iter().map(|index| *index as f32 / n_vocab).collect()
}
