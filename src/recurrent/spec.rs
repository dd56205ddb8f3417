use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::loss::LossType;
use crate::math::WeightInit;
use crate::optim::Learning;
use crate::recurrent::clip::Clip;

fn tanh() -> ActivationFunction {
    ActivationFunction::Tanh
}

fn identity() -> ActivationFunction {
    ActivationFunction::Identity
}

fn check_sizes(what: &str, sizes: &[(&str, usize)]) -> Result<()> {
    for (name, size) in sizes {
        if *size == 0 {
            return Err(Error::InvalidConfig(format!("{what}: {name} must be positive")));
        }
    }
    Ok(())
}

/// Shape and training rule of a plain recurrent layer.
///
/// - `window`            — number of time steps unrolled per backward pass
/// - `activation`        — hidden-state activation (Tanh unless given)
/// - `output_activation` — applied to the output projection (Identity unless given)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RnnSpec {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub window: usize,
    #[serde(default = "tanh")]
    pub activation: ActivationFunction,
    #[serde(default = "identity")]
    pub output_activation: ActivationFunction,
    #[serde(default)]
    pub learning: Learning,
    #[serde(default)]
    pub init: WeightInit,
    #[serde(default)]
    pub clip: Clip,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RnnSpec {
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize, window: usize) -> RnnSpec {
        RnnSpec {
            input_size,
            hidden_size,
            output_size,
            window,
            activation: tanh(),
            output_activation: identity(),
            learning: Learning::default(),
            init: WeightInit::default(),
            clip: Clip::default(),
            seed: None,
        }
    }

    pub fn with_activation(mut self, activation: ActivationFunction) -> RnnSpec {
        self.activation = activation;
        self
    }

    pub fn with_output_activation(mut self, activation: ActivationFunction) -> RnnSpec {
        self.output_activation = activation;
        self
    }

    pub fn with_learning(mut self, learning: Learning) -> RnnSpec {
        self.learning = learning;
        self
    }

    pub fn with_init(mut self, init: WeightInit) -> RnnSpec {
        self.init = init;
        self
    }

    pub fn with_clip(mut self, clip: Clip) -> RnnSpec {
        self.clip = clip;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> RnnSpec {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_sizes("rnn", &[
            ("input_size", self.input_size),
            ("hidden_size", self.hidden_size),
            ("output_size", self.output_size),
            ("window", self.window),
        ])?;
        if self.activation.is_joint() {
            return Err(Error::InvalidConfig("softmax cannot be a hidden-state activation".into()));
        }
        self.learning.validate()?;
        self.init.validate()?;
        self.clip.validate()
    }
}

/// Shape and training rule of an LSTM layer. Gate activations are fixed
/// (sigmoid for forget/input/output, tanh for the candidate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmSpec {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub window: usize,
    #[serde(default = "identity")]
    pub output_activation: ActivationFunction,
    #[serde(default)]
    pub learning: Learning,
    #[serde(default)]
    pub init: WeightInit,
    #[serde(default)]
    pub clip: Clip,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl LstmSpec {
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize, window: usize) -> LstmSpec {
        LstmSpec {
            input_size,
            hidden_size,
            output_size,
            window,
            output_activation: identity(),
            learning: Learning::default(),
            init: WeightInit::default(),
            clip: Clip::default(),
            seed: None,
        }
    }

    pub fn with_output_activation(mut self, activation: ActivationFunction) -> LstmSpec {
        self.output_activation = activation;
        self
    }

    pub fn with_learning(mut self, learning: Learning) -> LstmSpec {
        self.learning = learning;
        self
    }

    pub fn with_init(mut self, init: WeightInit) -> LstmSpec {
        self.init = init;
        self
    }

    pub fn with_clip(mut self, clip: Clip) -> LstmSpec {
        self.clip = clip;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> LstmSpec {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_sizes("lstm", &[
            ("input_size", self.input_size),
            ("hidden_size", self.hidden_size),
            ("output_size", self.output_size),
            ("window", self.window),
        ])?;
        self.learning.validate()?;
        self.init.validate()?;
        self.clip.validate()
    }
}

/// Driver settings for a `RecurrentNetwork`.
///
/// `window` must match the wrapped layer's unroll length; `report_every`
/// sets how many trained windows pass between progress logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentSpec {
    pub window: usize,
    #[serde(default)]
    pub loss: LossType,
    #[serde(default = "default_report_every")]
    pub report_every: usize,
}

fn default_report_every() -> usize {
    1000
}

impl RecurrentSpec {
    pub fn new(window: usize, loss: LossType) -> RecurrentSpec {
        RecurrentSpec { window, loss, report_every: default_report_every() }
    }

    pub fn with_report_every(mut self, report_every: usize) -> RecurrentSpec {
        self.report_every = report_every;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_sizes("recurrent network", &[
            ("window", self.window),
            ("report_every", self.report_every),
        ])
    }
}
