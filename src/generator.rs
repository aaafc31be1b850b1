use std::collections::VecDeque;

use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::dataset::Dataset;
use super::error::{ConfigError, ModelError, Result, TokenError};
use super::model::{Predictor, Tensor};
use super::token::Token;
use super::vocab::Vocabulary;

/// How the next index is chosen from the model's output.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Decoder {
    /// Always the highest-scoring index.
    #[default]
    Greedy,
    /// Sample from the scores sharpened (T < 1) or flattened (T > 1) by
    /// `temperature`, optionally keeping only the `top_k` best.
    Temperature {
        temperature: f32,
        top_k: Option<usize>,
    },
}

impl Decoder {
    pub fn select<R: Rng>(
        &self,
        scores: &[f32],
        rng: &mut R,
    ) -> std::result::Result<usize, ModelError> {
        let best = argmax(scores).ok_or(ModelError::NoFiniteScores)?;
        match *self {
            Decoder::Greedy => Ok(best),
            Decoder::Temperature { temperature, top_k } => {
                let weights = tempered_weights(scores, temperature, top_k);
                // Everything was cut or underflowed: the best index is the
                // only sensible choice left.
                Ok(WeightedIndex::new(&weights)
                    .map(|dist| dist.sample(rng))
                    .unwrap_or(best))
            }
        }
    }
}

/// Index of the first maximum. NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in scores.iter().copied().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Scores are read as probabilities: each becomes `p^(1/T)`, and with
/// `top_k` everything below the k-th best is zeroed.
fn tempered_weights(scores: &[f32], temperature: f32, top_k: Option<usize>) -> Vec<f64> {
    let exponent = 1.0 / f64::from(temperature);
    let mut weights: Vec<f64> = scores
        .iter()
        .map(|score| {
            let p = f64::from(*score);
            if p.is_finite() && p > 0.0 {
                p.powf(exponent)
            } else {
                0.0
            }
        })
        .collect();

    if let Some(k) = top_k.map(|k| k.max(1)).filter(|k| *k < weights.len()) {
        let mut ranked = weights.clone();
        ranked.sort_by(|a, b| b.total_cmp(a));
        let threshold = ranked[k - 1];
        // Ties at the threshold are kept in index order until k are kept.
        let mut ties_left = k - weights.iter().filter(|w| **w > threshold).count();
        for weight in weights.iter_mut() {
            if *weight > threshold {
                continue;
            }
            if *weight == threshold && ties_left > 0 {
                ties_left -= 1;
            } else {
                *weight = 0.0;
            }
        }
    }
    weights
}

/// Autoregressive generation: the model's choice is appended to the output
/// and to the window, and the oldest index drops out of the window.
pub struct Generator<'a, P: Predictor + ?Sized> {
    model: &'a P,
    vocab: &'a Vocabulary,
    horizon: usize,
    decoder: Decoder,
}

impl<'a, P: Predictor + ?Sized> Generator<'a, P> {
    pub fn new(model: &'a P, vocab: &'a Vocabulary, horizon: usize) -> Self {
        Self {
            model,
            vocab,
            horizon,
            decoder: Decoder::Greedy,
        }
    }

    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Generate from a window picked uniformly at random from `dataset`.
    pub fn generate<R: Rng>(&self, dataset: &Dataset, rng: &mut R) -> Result<Vec<Token>> {
        if dataset.is_empty() {
            return Err(ConfigError::CorpusTooShort {
                tokens: 0,
                sequence_length: dataset.sequence_length(),
            }
            .into());
        }
        let start = rng.gen_range(0..dataset.len());
        info!("Seeding generation with window {} of {}", start, dataset.len());
        let seed = dataset.windows()[start].as_slice();
        self.generate_from_seed(seed, rng)
    }

    /// Generate from a fixed seed window. With the greedy decoder the RNG is
    /// never used and the output depends only on the seed and the model.
    pub fn generate_from_seed<R: Rng>(
        &self,
        seed: &[usize],
        rng: &mut R,
    ) -> Result<Vec<Token>> {
        if seed.is_empty() {
            return Err(ConfigError::Invalid("seed window is empty".to_string()).into());
        }
        let n_vocab = self.vocab.len();
        if let Some(&index) = seed.iter().find(|&&index| index >= n_vocab) {
            return Err(TokenError::UnknownIndex(index).into());
        }
        let mut window: VecDeque<usize> = seed.iter().copied().collect();
        let mut output = Vec::with_capacity(self.horizon);

        for step in 0..self.horizon {
            let input = Tensor::from_window(window.make_contiguous(), n_vocab);
            let scores = self.model.predict(&input)?;
            if scores.len() != n_vocab {
                return Err(ModelError::OutputSize {
                    expected: n_vocab,
                    actual: scores.len(),
                }
                .into());
            }

            let index = self.decoder.select(&scores, rng)?;
            output.push(self.vocab.decode(index)?.clone());

            window.push_back(index);
            window.pop_front();

            if (step + 1) % 100 == 0 {
                debug!("Generated {}/{} tokens", step + 1, self.horizon);
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::tests::successor_model;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    fn vocab(size: usize) -> Vocabulary {
        let tokens: Vec<Token> = (0..size).map(|i| Token::new(format!("t{:02}", i))).collect();
        Vocabulary::new(&tokens)
    }

    /// Records every window it is shown and always answers `answer`.
    struct Recorder {
        n_vocab: usize,
        answer: usize,
        seen: RefCell<Vec<Vec<f32>>>,
    }

    impl Predictor for Recorder {
        fn predict(&self, input: &Tensor) -> std::result::Result<Vec<f32>, ModelError> {
            self.seen.borrow_mut().push(input.data().to_vec());
            let mut scores = vec![0.0; self.n_vocab];
            scores[self.answer] = 1.0;
            Ok(scores)
        }
    }

    #[test]
    fn argmax_takes_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.2, 0.5]), Some(0));
        assert_eq!(argmax(&[f32::NAN, 0.1, 0.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn produces_horizon_tokens_deterministically() {
        let vocab = vocab(6);
        let model = successor_model(4, 6);
        let generator = Generator::new(&model, &vocab, 25);
        let mut rng = StdRng::seed_from_u64(1);

        let first = generator.generate_from_seed(&[0, 1, 2, 3], &mut rng).unwrap();
        let second = generator.generate_from_seed(&[0, 1, 2, 3], &mut rng).unwrap();
        assert_eq!(first.len(), 25);
        assert_eq!(first, second);

        let names: Vec<&str> = first.iter().take(4).map(Token::as_str).collect();
        assert_eq!(names, ["t04", "t05", "t00", "t01"]);
    }

    #[test]
    fn window_slides_by_one() {
        let vocab = vocab(5);
        let recorder = Recorder {
            n_vocab: 5,
            answer: 4,
            seen: RefCell::new(Vec::new()),
        };
        let generator = Generator::new(&recorder, &vocab, 3);
        generator
            .generate_from_seed(&[1, 2, 3], &mut StdRng::seed_from_u64(0))
            .unwrap();

        let seen = recorder.seen.borrow();
        let expected: Vec<Vec<f32>> = [[1, 2, 3], [2, 3, 4], [3, 4, 4]]
            .iter()
            .map(|w| w.iter().map(|i| *i as f32 / 5.0).collect())
            .collect();
        assert_eq!(*seen, expected);
        assert!(seen.iter().flatten().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn random_seed_comes_from_dataset() {
        let tokens: Vec<Token> = ["a", "b", "c", "d", "e", "a", "b", "c"]
            .iter()
            .map(|n| Token::from(*n))
            .collect();
        let vocab = Vocabulary::new(&tokens);
        let dataset = Dataset::build(&tokens, &vocab, 3).unwrap();
        let model = successor_model(3, vocab.len());
        let generator = Generator::new(&model, &vocab, 10);

        let run = |seed| {
            generator
                .generate(&dataset, &mut StdRng::seed_from_u64(seed))
                .unwrap()
        };
        assert_eq!(run(7).len(), 10);
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn seed_outside_vocabulary_is_rejected() {
        let vocab = vocab(2);
        let recorder = Recorder {
            n_vocab: 2,
            answer: 0,
            seen: RefCell::new(Vec::new()),
        };
        let result = Generator::new(&recorder, &vocab, 3)
            .generate_from_seed(&[5, 9], &mut StdRng::seed_from_u64(0));
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::UnknownIndex(5)))
        ));
        assert!(recorder.seen.borrow().is_empty());
    }

    #[test]
    fn wrong_output_size_is_reported() {
        let vocab = vocab(4);
        let recorder = Recorder {
            n_vocab: 3,
            answer: 0,
            seen: RefCell::new(Vec::new()),
        };
        let result = Generator::new(&recorder, &vocab, 5)
            .generate_from_seed(&[0, 1], &mut StdRng::seed_from_u64(0));
        assert!(matches!(
            result,
            Err(Error::Model(ModelError::OutputSize { expected: 4, actual: 3 }))
        ));
    }

    #[test]
    fn temperature_respects_top_k() {
        let decoder = Decoder::Temperature {
            temperature: 1.0,
            top_k: Some(2),
        };
        let scores = [0.05, 0.4, 0.05, 0.5];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let index = decoder.select(&scores, &mut rng).unwrap();
            assert!(index == 1 || index == 3);
        }
    }

    #[test]
    fn top_k_keeps_ties_below_the_best() {
        let weights = tempered_weights(&[0.4, 0.4, 0.5, 0.1], 1.0, Some(2));
        assert_eq!(weights, vec![0.4f32 as f64, 0.0, 0.5f32 as f64, 0.0]);
    }

    #[test]
    fn low_temperature_approaches_greedy() {
        let decoder = Decoder::Temperature {
            temperature: 0.01,
            top_k: None,
        };
        let scores = [0.2, 0.3, 0.5];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            assert_eq!(decoder.select(&scores, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn sampling_falls_back_to_best_when_nothing_is_positive() {
        let decoder = Decoder::Temperature {
            temperature: 1.0,
            top_k: None,
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(decoder.select(&[-1.0, -0.5, -2.0], &mut rng).unwrap(), 1);
        assert!(decoder.select(&[f32::NAN], &mut rng).is_err());
    }
}
