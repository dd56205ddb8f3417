use crate::math::Matrix;
use crate::optim::Learning;
use crate::recurrent::clip::Clip;

/// A shared weight matrix with its momentum history and the gradient
/// accumulated over the current window.
#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub(crate) value: Matrix,
    pub(crate) grad: Matrix,
    previous: Matrix,
}

impl Param {
    pub(crate) fn new(value: Matrix) -> Param {
        let grad = Matrix::zeros(value.rows, value.cols);
        let previous = Matrix::zeros(value.rows, value.cols);
        Param { value, grad, previous }
    }

    pub(crate) fn zero_grad(&mut self) {
        self.grad = Matrix::zeros(self.value.rows, self.value.cols);
    }

    /// Clips the accumulated gradient and applies it once.
    pub(crate) fn apply(&mut self, learning: &Learning, clip: &Clip) {
        clip.matrix(&mut self.grad);
        for ((w, g), p) in self.value.data.iter_mut()
            .zip(&self.grad.data)
            .zip(self.previous.data.iter_mut())
        {
            learning.step(w, g, p);
        }
        self.zero_grad();
    }
}

/// Bias counterpart of `Param`.
#[derive(Debug, Clone)]
pub(crate) struct BiasParam {
    pub(crate) value: Vec<f64>,
    pub(crate) grad: Vec<f64>,
    previous: Vec<f64>,
}

impl BiasParam {
    pub(crate) fn new(value: Vec<f64>) -> BiasParam {
        let n = value.len();
        BiasParam { value, grad: vec![0.0; n], previous: vec![0.0; n] }
    }

    pub(crate) fn zero_grad(&mut self) {
        self.grad.iter_mut().for_each(|g| *g = 0.0);
    }

    pub(crate) fn apply(&mut self, learning: &Learning, clip: &Clip) {
        clip.vector(&mut self.grad);
        learning.step(&mut self.value, &self.grad, &mut self.previous);
        self.zero_grad();
    }
}
