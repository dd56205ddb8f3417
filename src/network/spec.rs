use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{check_dim, Error, Result};
use crate::loss::loss_type::LossType;
use crate::math::{Matrix, WeightInit};
use crate::optim::Learning;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `size`       — number of cells in this layer
/// - `input_size` — number of values feeding into this layer (i.e. the output
///                  size of the previous layer, or the raw input dimension for
///                  the first layer)
/// - `activation` — activation applied after the linear transform; `Softmax`
///                  selects the jointly-normalised output layer
/// - `learning`   — rate / momentum / decay of this layer's updates
/// - `init`       — how weights are drawn when `weights` is not given
/// - `weights`    — optional explicit `(size, input_size)` starting matrix
/// - `biases`     — optional explicit starting biases; zeros when weights are
///                  explicit and biases are not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
    #[serde(default)]
    pub learning: Learning,
    #[serde(default)]
    pub init: WeightInit,
    #[serde(default)]
    pub weights: Option<Matrix>,
    #[serde(default)]
    pub biases: Option<Vec<f64>>,
}

impl LayerSpec {
    pub fn new(size: usize, input_size: usize, activation: ActivationFunction) -> LayerSpec {
        LayerSpec {
            size,
            input_size,
            activation,
            learning: Learning::default(),
            init: WeightInit::default(),
            weights: None,
            biases: None,
        }
    }

    pub fn with_learning(mut self, learning: Learning) -> LayerSpec {
        self.learning = learning;
        self
    }

    pub fn with_init(mut self, init: WeightInit) -> LayerSpec {
        self.init = init;
        self
    }

    pub fn with_weights(mut self, weights: Matrix) -> LayerSpec {
        self.weights = Some(weights);
        self
    }

    pub fn with_biases(mut self, biases: Vec<f64>) -> LayerSpec {
        self.biases = Some(biases);
        self
    }

    /// Checks sizes and any explicit weights against the declared shape.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 || self.input_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer needs at least one input and one output, got {}x{}",
                self.size, self.input_size
            )));
        }
        self.learning.validate()?;
        self.init.validate()?;
        if let Some(w) = &self.weights {
            w.check_shape("layer weights", self.size, self.input_size)?;
        }
        if let Some(b) = &self.biases {
            check_dim("layer biases", self.size, b.len())?;
        }
        Ok(())
    }
}

/// A fully serializable description of a network architecture plus its
/// training loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    /// Loss function to pair with this network during training.
    #[serde(default)]
    pub loss: LossType,
    /// Seed for the weight generator; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NetworkSpec {
    pub fn new(loss: LossType) -> NetworkSpec {
        NetworkSpec { layers: Vec::new(), loss, seed: None }
    }

    pub fn layer(mut self, layer: LayerSpec) -> NetworkSpec {
        self.layers.push(layer);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> NetworkSpec {
        self.seed = Some(seed);
        self
    }

    /// Checks every layer and that each layer's output width is the next
    /// layer's input width. Softmax is only accepted on the output layer.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig("network has no layers".into()));
        }
        for layer in &self.layers {
            layer.validate()?;
        }
        for pair in self.layers.windows(2) {
            check_dim("chained layer input", pair[0].size, pair[1].input_size)?;
        }
        let last = self.layers.len() - 1;
        if self.layers[..last].iter().any(|l| l.activation.is_joint()) {
            return Err(Error::InvalidConfig("softmax is only supported on the output layer".into()));
        }
        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size).unwrap_or(0)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
