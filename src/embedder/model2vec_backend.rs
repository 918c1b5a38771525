//! Real neural embedding backend, behind the `model2vec` feature. Grounded
//! directly in the teacher's `CodebaseIndex`, which loads a `StaticModel`
//! once and calls it synchronously per chunk.

use std::path::Path;

use model2vec_rs::model::StaticModel;

use crate::error::{Result, VectorStoreError};

use super::EmbeddingBackend;

pub struct Model2VecBackend {
    model: StaticModel,
    dimension: usize,
}

impl Model2VecBackend {
    pub fn load(artifact_path: &Path, dimension: usize) -> Result<Self> {
        let model = StaticModel::from_pretrained(artifact_path, None, None, None)
            .map_err(|err| VectorStoreError::model_unavailable(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))?;
        Ok(Self { model, dimension })
    }
}

impl EmbeddingBackend for Model2VecBackend {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.model.encode(&[text.to_string()]);
        vectors
            .pop()
            .ok_or_else(|| VectorStoreError::invalid_input("model2vec returned no embedding for input"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
