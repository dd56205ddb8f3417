use rand::rngs::StdRng;

use crate::activation::{softmax, softmax_backward, ActivationFunction};
use crate::error::{check_dim, Error, Result};
use crate::layers::cell::{Cell, CellGradient};
use crate::layers::weights::{Meta, Weights};
use crate::math::{vector, Matrix};
use crate::network::spec::LayerSpec;

/// How the cells' pre-activations become outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Each cell applies its own activation.
    Activated,
    /// Outputs are normalised jointly over all cells.
    Softmax,
}

/// Gradients of one layer backward step.
#[derive(Debug, Clone)]
pub struct LayerGradient {
    pub weights: Matrix,
    pub biases: Vec<f64>,
    /// Sum of the cells' input gradients, in cell order.
    pub input: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Layer {
    meta: Meta,
    kind: LayerKind,
    activation: ActivationFunction,
    input_size: usize,
    cells: Vec<Cell>,
}

impl Layer {
    /// Builds the cells from a validated spec, drawing missing weights from `rng`.
    pub fn new(meta: Meta, spec: &LayerSpec, rng: &mut StdRng) -> Result<Layer> {
        spec.validate()?;

        let weights = match &spec.weights {
            Some(w) => w.clone(),
            None => spec.init.matrix(spec.size, spec.input_size, rng),
        };
        let biases = match (&spec.biases, &spec.weights) {
            (Some(b), _) => b.clone(),
            (None, Some(_)) => vec![0.0; spec.size],
            (None, None) => spec.init.vector(spec.size, spec.input_size, rng),
        };

        let cells = weights.data.into_iter().zip(biases)
            .map(|(w, b)| Cell::new(w, b, spec.activation.clone(), spec.learning))
            .collect();

        let kind = if spec.activation.is_joint() { LayerKind::Softmax } else { LayerKind::Activated };

        Ok(Layer {
            meta,
            kind,
            activation: spec.activation.clone(),
            input_size: spec.input_size,
            cells,
        })
    }

    pub fn meta(&self) -> Meta {
        self.meta
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn activation(&self) -> &ActivationFunction {
        &self.activation
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Forward pass; each cell keeps what its backward step needs.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        check_dim("layer input", self.input_size, input.len())?;
        match self.kind {
            LayerKind::Activated => self.cells.iter_mut().map(|c| c.forward(input)).collect(),
            LayerKind::Softmax => {
                let z = self.cells.iter_mut()
                    .map(|c| c.linear(input))
                    .collect::<Result<Vec<f64>>>()?;
                Ok(softmax(&z))
            }
        }
    }

    /// Pure forward pass.
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>> {
        check_dim("layer input", self.input_size, input.len())?;
        match self.kind {
            LayerKind::Activated => self.cells.iter().map(|c| c.evaluate(input)).collect(),
            LayerKind::Softmax => {
                let z = self.cells.iter()
                    .map(|c| Ok(vector::dot(c.weights(), input)? + c.bias()))
                    .collect::<Result<Vec<f64>>>()?;
                Ok(softmax(&z))
            }
        }
    }

    /// Pre-activations recorded by the last `forward`.
    pub fn pre_activations(&self) -> Vec<f64> {
        self.cells.iter().map(|c| c.pre_activation()).collect()
    }

    /// Outputs of the last `forward`.
    pub fn outputs(&self) -> Vec<f64> {
        match self.kind {
            LayerKind::Activated => self.cells.iter().map(|c| c.output()).collect(),
            LayerKind::Softmax => softmax(&self.pre_activations()),
        }
    }

    /// Backward step from `∂L/∂output`, updating every cell.
    pub fn backward(&mut self, output_grads: &[f64]) -> Result<LayerGradient> {
        check_dim("layer output gradient", self.size(), output_grads.len())?;
        self.check_primed()?;
        match self.kind {
            LayerKind::Activated => {
                let grads = self.cells.iter_mut().zip(output_grads)
                    .map(|(c, &g)| c.backward(g))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.collect(grads))
            }
            LayerKind::Softmax => {
                let deltas = softmax_backward(&self.outputs(), output_grads)?;
                self.backward_logits(&deltas)
            }
        }
    }

    /// Backward step from gradients already taken w.r.t. the pre-activations.
    pub fn backward_logits(&mut self, deltas: &[f64]) -> Result<LayerGradient> {
        check_dim("layer pre-activation gradient", self.size(), deltas.len())?;
        self.check_primed()?;
        let grads = self.cells.iter_mut().zip(deltas)
            .map(|(c, &d)| c.apply_local(d))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.collect(grads))
    }

    /// `Wᵀ · v`: spreads a per-cell signal back over this layer's inputs.
    pub fn project(&self, v: &[f64]) -> Result<Vec<f64>> {
        check_dim("layer projection", self.size(), v.len())?;
        let mut res = vec![0.0; self.input_size];
        for (cell, &s) in self.cells.iter().zip(v) {
            res.iter_mut().zip(cell.weights()).for_each(|(r, w)| *r += w * s);
        }
        Ok(res)
    }

    pub fn weights(&self) -> Weights {
        Weights {
            w: Matrix {
                rows: self.cells.len(),
                cols: self.input_size,
                data: self.cells.iter().map(|c| c.weights().to_vec()).collect(),
            },
            b: self.cells.iter().map(|c| c.bias()).collect(),
        }
    }

    /// Loads weights of the same shape; momentum history is reset.
    pub fn restore(&mut self, weights: &Weights) -> Result<()> {
        weights.w.check_shape("restored weights", self.size(), self.input_size)?;
        check_dim("restored biases", self.size(), weights.b.len())?;
        for ((cell, row), &b) in self.cells.iter_mut().zip(&weights.w.data).zip(&weights.b) {
            cell.restore(row, b)?;
        }
        Ok(())
    }

    fn check_primed(&self) -> Result<()> {
        if self.cells.iter().all(|c| c.is_primed()) {
            Ok(())
        } else {
            Err(Error::InvalidState(format!("layer {} backward without a forward pass", self.meta.layer)))
        }
    }

    fn collect(&self, grads: Vec<CellGradient>) -> LayerGradient {
        let mut input = vec![0.0; self.input_size];
        let mut biases = Vec::with_capacity(grads.len());
        let mut rows = Vec::with_capacity(grads.len());
        for g in grads {
            input.iter_mut().zip(&g.input).for_each(|(acc, x)| *acc += x);
            biases.push(g.bias);
            rows.push(g.weights);
        }
        LayerGradient {
            weights: Matrix { rows: rows.len(), cols: self.input_size, data: rows },
            biases,
            input,
        }
    }
}
