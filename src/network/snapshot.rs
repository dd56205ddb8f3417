use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::layers::{Meta, Weights};

/// Weights of every layer, keyed by layer identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSnapshot(pub BTreeMap<Meta, Weights>);

impl WeightSnapshot {
    pub fn get(&self, meta: &Meta) -> Option<&Weights> {
        self.0.get(meta)
    }

    pub fn layer(&self, layer: usize) -> Option<&Weights> {
        self.0.get(&Meta::layer(layer))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Meta, &Weights)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every layer rounded to `decimals` places.
    pub fn round(&self, decimals: i32) -> WeightSnapshot {
        WeightSnapshot(self.0.iter().map(|(k, v)| (*k, v.round(decimals))).collect())
    }

    /// Serializes the snapshot to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a snapshot previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<WeightSnapshot> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl FromIterator<(Meta, Weights)> for WeightSnapshot {
    fn from_iter<I: IntoIterator<Item = (Meta, Weights)>>(iter: I) -> Self {
        WeightSnapshot(iter.into_iter().collect())
    }
}

/// Outcome of one supervised training step.
#[derive(Debug, Clone)]
pub struct TrainStep {
    /// `expected - predicted`, per output.
    pub error: Vec<f64>,
    /// Scalar loss of the step.
    pub loss: f64,
    /// Weights after the update.
    pub weights: WeightSnapshot,
}
