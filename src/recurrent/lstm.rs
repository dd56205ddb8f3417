use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::{check_dim, Error, Result};
use crate::loss::{output_delta, LossType};
use crate::math::{init, vector, Matrix};
use crate::optim::Learning;
use crate::recurrent::clip::Clip;
use crate::recurrent::param::{BiasParam, Param};
use crate::recurrent::spec::LstmSpec;
use crate::recurrent::{check_sequence, Recurrent};

/// Weights of an `LstmLayer`. Gate matrices are `(hidden, input + hidden)`
/// and act on `[x, h]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmWeights {
    pub wf: Matrix,
    pub wi: Matrix,
    pub wg: Matrix,
    pub wo: Matrix,
    /// hidden → output, `(output, hidden)`
    pub wy: Matrix,
    pub bf: Vec<f64>,
    pub bi: Vec<f64>,
    pub bg: Vec<f64>,
    pub bo: Vec<f64>,
    pub by: Vec<f64>,
}

impl LstmWeights {
    fn check(&self, spec: &LstmSpec) -> Result<()> {
        let concat = spec.input_size + spec.hidden_size;
        for gate in [&self.wf, &self.wi, &self.wg, &self.wo] {
            gate.check_shape("lstm gate weights", spec.hidden_size, concat)?;
        }
        self.wy.check_shape("lstm output weights", spec.output_size, spec.hidden_size)?;
        for b in [&self.bf, &self.bi, &self.bg, &self.bo] {
            check_dim("lstm gate biases", spec.hidden_size, b.len())?;
        }
        check_dim("lstm output biases", spec.output_size, self.by.len())
    }
}

/// Values of one time step.
#[derive(Debug, Clone)]
struct Step {
    xh: Vec<f64>,
    f: Vec<f64>,
    i: Vec<f64>,
    g: Vec<f64>,
    o: Vec<f64>,
    c: Vec<f64>,
    tanh_c: Vec<f64>,
    h: Vec<f64>,
    output_pre: Vec<f64>,
    output: Vec<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Gated recurrent layer:
///
/// ```text
/// f = σ(Wf·[x,h] + bf)    i = σ(Wi·[x,h] + bi)
/// g = tanh(Wg·[x,h] + bg) o = σ(Wo·[x,h] + bo)
/// c' = f⊙c + i⊙g          h' = o⊙tanh(c')
/// y = out_act(Wy·h' + by)
/// ```
///
/// Hidden state and memory start at zero for every window.
#[derive(Debug, Clone)]
pub struct LstmLayer {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    window: usize,
    output_activation: ActivationFunction,
    learning: Learning,
    clip: Clip,
    wf: Param,
    wi: Param,
    wg: Param,
    wo: Param,
    wy: Param,
    bf: BiasParam,
    bi: BiasParam,
    bg: BiasParam,
    bo: BiasParam,
    by: BiasParam,
    steps: Vec<Step>,
}

impl LstmLayer {
    pub fn new(spec: LstmSpec) -> Result<LstmLayer> {
        spec.validate()?;
        let mut rng = init::rng_from(spec.seed);
        let (hidden, concat) = (spec.hidden_size, spec.input_size + spec.hidden_size);
        let weights = LstmWeights {
            wf: spec.init.matrix(hidden, concat, &mut rng),
            wi: spec.init.matrix(hidden, concat, &mut rng),
            wg: spec.init.matrix(hidden, concat, &mut rng),
            wo: spec.init.matrix(hidden, concat, &mut rng),
            wy: spec.init.matrix(spec.output_size, hidden, &mut rng),
            bf: spec.init.vector(hidden, concat, &mut rng),
            bi: spec.init.vector(hidden, concat, &mut rng),
            bg: spec.init.vector(hidden, concat, &mut rng),
            bo: spec.init.vector(hidden, concat, &mut rng),
            by: spec.init.vector(spec.output_size, hidden, &mut rng),
        };
        Ok(LstmLayer::build(spec, weights))
    }

    pub fn with_weights(spec: LstmSpec, weights: LstmWeights) -> Result<LstmLayer> {
        spec.validate()?;
        weights.check(&spec)?;
        Ok(LstmLayer::build(spec, weights))
    }

    fn build(spec: LstmSpec, weights: LstmWeights) -> LstmLayer {
        LstmLayer {
            input_size: spec.input_size,
            hidden_size: spec.hidden_size,
            output_size: spec.output_size,
            window: spec.window,
            output_activation: spec.output_activation,
            learning: spec.learning,
            clip: spec.clip,
            wf: Param::new(weights.wf),
            wi: Param::new(weights.wi),
            wg: Param::new(weights.wg),
            wo: Param::new(weights.wo),
            wy: Param::new(weights.wy),
            bf: BiasParam::new(weights.bf),
            bi: BiasParam::new(weights.bi),
            bg: BiasParam::new(weights.bg),
            bo: BiasParam::new(weights.bo),
            by: BiasParam::new(weights.by),
            steps: Vec::new(),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn gate(w: &Param, b: &BiasParam, xh: &[f64], f: fn(f64) -> f64) -> Result<Vec<f64>> {
        let mut z = w.value.mul_vec(xh)?;
        vector::add_assign(&mut z, &b.value)?;
        Ok(z.into_iter().map(f).collect())
    }

    fn step(&self, x: &[f64], h_prev: &[f64], c_prev: &[f64]) -> Result<Step> {
        let xh = vector::concat(x, h_prev);
        let f = LstmLayer::gate(&self.wf, &self.bf, &xh, sigmoid)?;
        let i = LstmLayer::gate(&self.wi, &self.bi, &xh, sigmoid)?;
        let g = LstmLayer::gate(&self.wg, &self.bg, &xh, f64::tanh)?;
        let o = LstmLayer::gate(&self.wo, &self.bo, &xh, sigmoid)?;

        let c: Vec<f64> = (0..self.hidden_size)
            .map(|k| f[k] * c_prev[k] + i[k] * g[k])
            .collect();
        let tanh_c: Vec<f64> = c.iter().map(|v| v.tanh()).collect();
        let h = vector::hadamard(&o, &tanh_c)?;

        let mut output_pre = self.wy.value.mul_vec(&h)?;
        vector::add_assign(&mut output_pre, &self.by.value)?;
        let output = self.output_activation.apply(&output_pre);

        Ok(Step { xh, f, i, g, o, c, tanh_c, h, output_pre, output })
    }

    fn params(&mut self) -> [&mut Param; 5] {
        [&mut self.wf, &mut self.wi, &mut self.wg, &mut self.wo, &mut self.wy]
    }

    fn biases(&mut self) -> [&mut BiasParam; 5] {
        [&mut self.bf, &mut self.bi, &mut self.bg, &mut self.bo, &mut self.by]
    }
}

impl Recurrent for LstmLayer {
    type Weights = LstmWeights;

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
        check_dim("lstm sequence length", self.window, inputs.len())?;
        check_sequence("lstm input", self.input_size, inputs)?;

        let mut steps: Vec<Step> = Vec::with_capacity(self.window);
        let zero = vec![0.0; self.hidden_size];
        for x in inputs {
            let step = match steps.last() {
                Some(prev) => self.step(x, &prev.h, &prev.c)?,
                None => self.step(x, &zero, &zero)?,
            };
            steps.push(step);
        }
        let outputs = steps.iter().map(|s| s.output.clone()).collect();
        self.steps = steps;
        self.params().into_iter().for_each(|p| p.zero_grad());
        self.biases().into_iter().for_each(|b| b.zero_grad());
        Ok(outputs)
    }

    fn evaluate(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        check_sequence("lstm input", self.input_size, inputs)?;
        let mut h = vec![0.0; self.hidden_size];
        let mut c = vec![0.0; self.hidden_size];
        let mut outputs = Vec::with_capacity(inputs.len());
        for x in inputs {
            let step = self.step(x, &h, &c)?;
            h = step.h;
            c = step.c;
            outputs.push(step.output);
        }
        Ok(outputs)
    }

    fn backward(&mut self, expected: &[Vec<f64>], loss: LossType) -> Result<()> {
        if self.steps.len() != self.window {
            return Err(Error::InvalidState("lstm backward without a forward pass".into()));
        }
        check_dim("lstm target length", self.window, expected.len())?;
        check_sequence("lstm target", self.output_size, expected)?;

        let n = self.hidden_size;
        let zero = vec![0.0; n];
        let mut dh_next = vec![0.0; n];
        let mut dc_next = vec![0.0; n];

        for t in (0..self.window).rev() {
            let s = &self.steps[t];
            let c_prev = if t == 0 { &zero } else { &self.steps[t - 1].c };

            let d_out = output_delta(loss, &self.output_activation, &s.output_pre, &s.output, &expected[t])?;
            self.wy.grad.add_outer(&d_out, &s.h, 1.0)?;
            vector::add_assign(&mut self.by.grad, &d_out)?;

            let mut dh = self.wy.value.transpose_mul_vec(&d_out)?;
            vector::add_assign(&mut dh, &dh_next)?;

            let mut d_o = vec![0.0; n];
            let mut d_f = vec![0.0; n];
            let mut d_i = vec![0.0; n];
            let mut d_g = vec![0.0; n];
            let mut dc = vec![0.0; n];
            for k in 0..n {
                d_o[k] = dh[k] * s.tanh_c[k] * s.o[k] * (1.0 - s.o[k]);
                dc[k] = dh[k] * s.o[k] * (1.0 - s.tanh_c[k] * s.tanh_c[k]) + dc_next[k];
                d_f[k] = dc[k] * c_prev[k] * s.f[k] * (1.0 - s.f[k]);
                d_i[k] = dc[k] * s.g[k] * s.i[k] * (1.0 - s.i[k]);
                d_g[k] = dc[k] * s.i[k] * (1.0 - s.g[k] * s.g[k]);
            }

            let mut dxh = vec![0.0; s.xh.len()];
            for (p, b, d) in [
                (&mut self.wf, &mut self.bf, &d_f),
                (&mut self.wi, &mut self.bi, &d_i),
                (&mut self.wg, &mut self.bg, &d_g),
                (&mut self.wo, &mut self.bo, &d_o),
            ] {
                p.grad.add_outer(d, &s.xh, 1.0)?;
                vector::add_assign(&mut b.grad, d)?;
                vector::add_assign(&mut dxh, &p.value.transpose_mul_vec(d)?)?;
            }

            dh_next = dxh[self.input_size..].to_vec();
            dc_next = vector::hadamard(&dc, &s.f)?;
        }

        let (learning, clip) = (self.learning, self.clip);
        self.params().into_iter().for_each(|p| p.apply(&learning, &clip));
        self.biases().into_iter().for_each(|b| b.apply(&learning, &clip));
        self.steps.clear();
        Ok(())
    }

    fn weights(&self) -> LstmWeights {
        LstmWeights {
            wf: self.wf.value.clone(),
            wi: self.wi.value.clone(),
            wg: self.wg.value.clone(),
            wo: self.wo.value.clone(),
            wy: self.wy.value.clone(),
            bf: self.bf.value.clone(),
            bi: self.bi.value.clone(),
            bg: self.bg.value.clone(),
            bo: self.bo.value.clone(),
            by: self.by.value.clone(),
        }
    }
}
