use super::{EmbeddingError, EmbeddingLoader, EmbeddingModel};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Deterministic bag-of-words model that hashes tokens into fixed buckets.
///
/// Texts sharing most of their vocabulary land close together under cosine distance, which is
/// enough to group near-duplicate posts without a neural model.
pub struct HashingEmbeddingModel {
    dimension: usize,
}

impl HashingEmbeddingModel {
    /// Construct a model producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0_u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            embedding[bucket] += 1.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingModel for HashingEmbeddingModel {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

/// Loader for [`HashingEmbeddingModel`]; fails only for a zero dimension.
pub struct HashingLoader {
    dimension: usize,
}

impl HashingLoader {
    /// Build a loader for vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingLoader for HashingLoader {
    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::Unavailable(
                "embedding dimension must be greater than zero".into(),
            ));
        }
        Ok(Arc::new(HashingEmbeddingModel::new(self.dimension)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn vectors_are_normalized_and_deterministic() {
        let model = HashingEmbeddingModel::new(64);
        let first = model.encode("Budget app for freelancers");
        let second = model.encode("budget APP for freelancers!");
        assert_eq!(first, second);
        let norm: f32 = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let model = HashingEmbeddingModel::new(16);
        assert!(model.encode("  ...  ").iter().all(|value| *value == 0.0));
    }

    #[test]
    fn shared_vocabulary_is_closer_than_disjoint_vocabulary() {
        let model = HashingEmbeddingModel::new(256);
        let base = model.encode("looking for a budgeting app for freelancers");
        let near = model.encode("looking for a good budgeting app for freelancers");
        let far = model.encode("my cat knocked the plant off the shelf");
        assert!(cosine(&base, &near) > 0.9);
        assert!(cosine(&base, &near) > cosine(&base, &far));
    }

    #[tokio::test]
    async fn zero_dimension_fails_to_load() {
        let loader = HashingLoader::new(0);
        assert!(matches!(
            loader.load().await,
            Err(EmbeddingError::Unavailable(_))
        ));
    }
}
