use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::{check_dim, Error, Result};
use crate::loss::{output_delta, LossType};
use crate::math::{init, vector, Matrix};
use crate::optim::Learning;
use crate::recurrent::clip::Clip;
use crate::recurrent::param::{BiasParam, Param};
use crate::recurrent::spec::RnnSpec;
use crate::recurrent::{check_sequence, Recurrent};

/// Weights of an `RnnLayer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnWeights {
    /// input → hidden, `(hidden, input)`
    pub wxh: Matrix,
    /// hidden → hidden, `(hidden, hidden)`
    pub whh: Matrix,
    /// hidden → output, `(output, hidden)`
    pub why: Matrix,
    pub bh: Vec<f64>,
    pub by: Vec<f64>,
}

impl RnnWeights {
    fn check(&self, spec: &RnnSpec) -> Result<()> {
        self.wxh.check_shape("rnn input weights", spec.hidden_size, spec.input_size)?;
        self.whh.check_shape("rnn recurrent weights", spec.hidden_size, spec.hidden_size)?;
        self.why.check_shape("rnn output weights", spec.output_size, spec.hidden_size)?;
        check_dim("rnn hidden biases", spec.hidden_size, self.bh.len())?;
        check_dim("rnn output biases", spec.output_size, self.by.len())
    }
}

/// Values of one time step.
#[derive(Debug, Clone)]
struct Step {
    input: Vec<f64>,
    hidden_pre: Vec<f64>,
    output_pre: Vec<f64>,
    output: Vec<f64>,
}

/// Elman recurrent layer unrolled over a fixed window:
///
/// `h_t = act(Wxh·x_t + Whh·h_{t-1} + bh)`, `y_t = out_act(Why·h_t + by)`.
///
/// Every window starts from a zero hidden state, so gradients never cross
/// a window boundary.
#[derive(Debug, Clone)]
pub struct RnnLayer {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    window: usize,
    activation: ActivationFunction,
    output_activation: ActivationFunction,
    learning: Learning,
    clip: Clip,
    wxh: Param,
    whh: Param,
    why: Param,
    bh: BiasParam,
    by: BiasParam,
    // window + 1 states, index 0 is the initial zero state
    hidden: Vec<Vec<f64>>,
    steps: Vec<Step>,
}

impl RnnLayer {
    /// Builds the layer with weights drawn from `spec.init`.
    pub fn new(spec: RnnSpec) -> Result<RnnLayer> {
        spec.validate()?;
        let mut rng = init::rng_from(spec.seed);
        let fan_in = spec.input_size + spec.hidden_size;
        let weights = RnnWeights {
            wxh: spec.init.matrix(spec.hidden_size, spec.input_size, &mut rng),
            whh: spec.init.matrix(spec.hidden_size, spec.hidden_size, &mut rng),
            why: spec.init.matrix(spec.output_size, spec.hidden_size, &mut rng),
            bh: spec.init.vector(spec.hidden_size, fan_in, &mut rng),
            by: spec.init.vector(spec.output_size, spec.hidden_size, &mut rng),
        };
        Ok(RnnLayer::build(spec, weights))
    }

    /// Builds the layer from explicit weights, rejecting any shape mismatch.
    pub fn with_weights(spec: RnnSpec, weights: RnnWeights) -> Result<RnnLayer> {
        spec.validate()?;
        weights.check(&spec)?;
        Ok(RnnLayer::build(spec, weights))
    }

    fn build(spec: RnnSpec, weights: RnnWeights) -> RnnLayer {
        RnnLayer {
            input_size: spec.input_size,
            hidden_size: spec.hidden_size,
            output_size: spec.output_size,
            window: spec.window,
            activation: spec.activation,
            output_activation: spec.output_activation,
            learning: spec.learning,
            clip: spec.clip,
            wxh: Param::new(weights.wxh),
            whh: Param::new(weights.whh),
            why: Param::new(weights.why),
            bh: BiasParam::new(weights.bh),
            by: BiasParam::new(weights.by),
            hidden: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Hidden states of the last forward pass, starting with the zero state.
    pub fn hidden_states(&self) -> &[Vec<f64>] {
        &self.hidden
    }

    fn step(&self, x: &[f64], h_prev: &[f64]) -> Result<(Step, Vec<f64>)> {
        let mut hidden_pre = self.wxh.value.mul_vec(x)?;
        vector::add_assign(&mut hidden_pre, &self.whh.value.mul_vec(h_prev)?)?;
        vector::add_assign(&mut hidden_pre, &self.bh.value)?;
        let h = self.activation.apply(&hidden_pre);

        let mut output_pre = self.why.value.mul_vec(&h)?;
        vector::add_assign(&mut output_pre, &self.by.value)?;
        let output = self.output_activation.apply(&output_pre);

        Ok((Step { input: x.to_vec(), hidden_pre, output_pre, output }, h))
    }

    fn zero_grads(&mut self) {
        for p in [&mut self.wxh, &mut self.whh, &mut self.why] {
            p.zero_grad();
        }
        self.bh.zero_grad();
        self.by.zero_grad();
    }
}

impl Recurrent for RnnLayer {
    type Weights = RnnWeights;

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn window(&self) -> usize {
        self.window
    }

    fn forward(&mut self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        check_dim("rnn sequence length", self.window, inputs.len())?;
        check_sequence("rnn input", self.input_size, inputs)?;

        let mut hidden = Vec::with_capacity(self.window + 1);
        let mut steps = Vec::with_capacity(self.window);
        hidden.push(vec![0.0; self.hidden_size]);
        for x in inputs {
            let (step, h) = self.step(x, &hidden[hidden.len() - 1])?;
            hidden.push(h);
            steps.push(step);
        }
        let outputs = steps.iter().map(|s| s.output.clone()).collect();
        self.hidden = hidden;
        self.steps = steps;
        self.zero_grads();
        Ok(outputs)
    }

    fn evaluate(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        check_sequence("rnn input", self.input_size, inputs)?;
        let mut h = vec![0.0; self.hidden_size];
        let mut outputs = Vec::with_capacity(inputs.len());
        for x in inputs {
            let (step, next) = self.step(x, &h)?;
            outputs.push(step.output);
            h = next;
        }
        Ok(outputs)
    }

    fn backward(&mut self, expected: &[Vec<f64>], loss: LossType) -> Result<()> {
        if self.steps.len() != self.window {
            return Err(Error::InvalidState("rnn backward without a forward pass".into()));
        }
        check_dim("rnn target length", self.window, expected.len())?;
        check_sequence("rnn target", self.output_size, expected)?;

        let mut dh_next = vec![0.0; self.hidden_size];
        for t in (0..self.window).rev() {
            let step = &self.steps[t];
            let (h, h_prev) = (&self.hidden[t + 1], &self.hidden[t]);

            let d_out = output_delta(
                loss,
                &self.output_activation,
                &step.output_pre,
                &step.output,
                &expected[t],
            )?;
            self.why.grad.add_outer(&d_out, h, 1.0)?;
            vector::add_assign(&mut self.by.grad, &d_out)?;

            let mut dh = self.why.value.transpose_mul_vec(&d_out)?;
            vector::add_assign(&mut dh, &dh_next)?;
            let da: Vec<f64> = dh.iter().zip(&step.hidden_pre)
                .map(|(g, &z)| g * self.activation.derivative(z))
                .collect();

            self.wxh.grad.add_outer(&da, &step.input, 1.0)?;
            self.whh.grad.add_outer(&da, h_prev, 1.0)?;
            vector::add_assign(&mut self.bh.grad, &da)?;
            dh_next = self.whh.value.transpose_mul_vec(&da)?;
        }

        for p in [&mut self.wxh, &mut self.whh, &mut self.why] {
            p.apply(&self.learning, &self.clip);
        }
        self.bh.apply(&self.learning, &self.clip);
        self.by.apply(&self.learning, &self.clip);
        self.steps.clear();
        Ok(())
    }

    fn weights(&self) -> RnnWeights {
        RnnWeights {
            wxh: self.wxh.value.clone(),
            whh: self.whh.value.clone(),
            why: self.why.value.clone(),
            bh: self.bh.value.clone(),
            by: self.by.value.clone(),
        }
    }
}
