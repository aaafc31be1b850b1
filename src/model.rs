// The predictive model is a black box behind the `Predictor` trait: it takes
// one normalized window shaped (1, sequence_length, 1) and returns one score
// per vocabulary entry.
//
// `DenseModel` is the persisted form this crate knows how to load: a small
// feed-forward network stored as JSON.
//
// {
//   "sequence_length": 100,
//   "n_vocab": 358,
//   "layers": [
//     { "weights": [[...100 floats...], ...], "bias": [...], "activation": "relu" },
//     { "weights": [[...]], "bias": [...358 floats...], "activation": "softmax" }
//   ]
// }

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::dataset::normalize;
use super::error::{ConfigError, ModelError, Result};

/// Row-major 3-D tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    /// A single window, normalized and shaped (1, len, 1).
    pub fn from_window(window: &[usize], n_vocab: usize) -> Self {
        Self::new([1, window.len(), 1], normalize(window, n_vocab))
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

pub trait Predictor {
    /// Scores for every vocabulary index, given one window.
    fn predict(&self, input: &Tensor) -> std::result::Result<Vec<f32>, ModelError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
    Softmax,
}

impl Activation {
    fn apply(&self, values: &mut [f32]) {
        match self {
            Activation::Linear => {}
            Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::Sigmoid => values
                .iter_mut()
                .for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
            Activation::Softmax => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                values.iter_mut().for_each(|v| *v = (*v - max).exp());
                let sum: f32 = values.iter().sum();
                if sum > 0.0 {
                    values.iter_mut().for_each(|v| *v /= sum);
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// One row per output unit.
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut output: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias)
            .collect();
        self.activation.apply(&mut output);
        output
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseModel {
    sequence_length: usize,
    n_vocab: usize,
    layers: Vec<DenseLayer>,
}

impl DenseModel {
    pub fn new(
        sequence_length: usize,
        n_vocab: usize,
        layers: Vec<DenseLayer>,
    ) -> std::result::Result<Self, ModelError> {
        let model = Self {
            sequence_length,
            n_vocab,
            layers,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, ModelError> {
        let model: DenseModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load a model artifact. A missing file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ConfigError::ModelNotFound(path.to_path_buf()).into());
        }
        let json = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json(&json)?;
        info!(
            "Model loaded from {} ({} layer(s), window {}, vocabulary {})",
            path.display(),
            model.layers.len(),
            model.sequence_length,
            model.n_vocab
        );
        Ok(model)
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn n_vocab(&self) -> usize {
        self.n_vocab
    }

    /// Every layer must consume what the previous one produced, starting
    /// from the window length and ending at the vocabulary size.
    fn validate(&self) -> std::result::Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::Shape("model has no layers".to_string()));
        }
        let mut width = self.sequence_length;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.is_empty() {
                return Err(ModelError::Shape(format!("layer {} has no units", i)));
            }
            if layer.weights.iter().any(|row| row.len() != width) {
                return Err(ModelError::Shape(format!(
                    "layer {} expects {} inputs, previous width is {}",
                    i,
                    layer.inputs(),
                    width
                )));
            }
            if layer.bias.len() != layer.weights.len() {
                return Err(ModelError::Shape(format!(
                    "layer {} has {} units but {} biases",
                    i,
                    layer.weights.len(),
                    layer.bias.len()
                )));
            }
            width = layer.weights.len();
        }
        if width != self.n_vocab {
            return Err(ModelError::Shape(format!(
                "last layer has {} units, vocabulary is {}",
                width, self.n_vocab
            )));
        }
        Ok(())
    }
}

impl Predictor for DenseModel {
    fn predict(&self, input: &Tensor) -> std::result::Result<Vec<f32>, ModelError> {
        if input.data().len() != self.sequence_length {
            return Err(ModelError::InputSize {
                expected: self.sequence_length,
                actual: input.data().len(),
            });
        }
        let output = self
            .layers
            .iter()
            .fold(input.data().to_vec(), |values, layer| layer.forward(&values));
        Ok(output)
    }
}
