// Model facade: the worker sees "a vector of the model's dimension, or an
// empty vector meaning the computation failed". Numeric failure (any NaN/Inf
// component) collapses the whole vector; partial vectors never leave here.

pub mod engine;

use std::path::Path;

use self::engine::BertEncoder;

/// Seam between the worker loop and the model, so loop tests can run against
/// a fixed-vector encoder instead of real weights.
pub trait SentenceEncoder {
    /// Embedding dimension of the loaded model.
    fn dims(&self) -> usize;

    /// Sentence vector for `text`: exactly `dims()` components, or empty on
    /// failure. Never errors; failure is part of the vector contract.
    fn sentence_vector(&self, text: &str) -> Vec<f32>;
}

pub struct EmbeddingModel {
    engine: BertEncoder,
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let engine = BertEncoder::load(model_dir)?;
        Ok(Self { engine })
    }
}

impl SentenceEncoder for EmbeddingModel {
    fn dims(&self) -> usize {
        self.engine.dims()
    }

    fn sentence_vector(&self, text: &str) -> Vec<f32> {
        match self.engine.embed(text) {
            Ok(vector) => finite_or_empty(vector),
            Err(e) => {
                log::error!("Embedding failed: {:?}", e);
                Vec::new()
            }
        }
    }
}

/// Any non-finite component invalidates the whole vector.
fn finite_or_empty(vector: Vec<f32>) -> Vec<f32> {
    if vector.iter().all(|c| c.is_finite()) {
        vector
    } else {
        log::warn!("Model produced a non-finite component, dropping vector");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_vector_passes_through() {
        let v = vec![0.1, -0.2, 0.3];
        assert_eq!(finite_or_empty(v.clone()), v);
    }

    #[test]
    fn nan_component_empties_whole_vector() {
        let v = vec![0.1, f32::NAN, 0.3];
        assert!(finite_or_empty(v).is_empty());
    }

    #[test]
    fn infinite_component_empties_whole_vector() {
        assert!(finite_or_empty(vec![f32::INFINITY, 0.0]).is_empty());
        assert!(finite_or_empty(vec![0.0, f32::NEG_INFINITY]).is_empty());
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(finite_or_empty(Vec::new()).is_empty());
    }
}
