//! In-memory nearest-neighbor index over chunk embeddings.
//!
//! [`VectorIndex`] is derived state: it is rebuilt from the chunk store at
//! process start and extended incrementally as documents are ingested. It is
//! never persisted. All vectors are L2-normalized on insertion and search, so
//! the inner product of two stored vectors equals their cosine similarity.
//!
//! The index is not internally synchronized. The owner serializes access:
//! searches may run concurrently with each other but never with an `add`
//! (in practice, a read-write lock around the index).

use crate::types::RagError;

/// Flat inner-product index keyed by chunk id.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    ids: Vec<i64>,
    data: Vec<f32>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Adds chunk vectors, normalizing each before insertion.
    pub fn add(&mut self, ids: &[i64], vectors: &[Vec<f32>]) -> Result<(), RagError> {
        if ids.len() != vectors.len() {
            return Err(RagError::Embedding(format!(
                "id/vector count mismatch: {} ids, {} vectors",
                ids.len(),
                vectors.len()
            )));
        }
        for (id, vector) in ids.iter().zip(vectors) {
            if vector.len() != self.dimension {
                return Err(RagError::Dimension {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
            let normalized = l2_normalize(vector.clone());
            self.ids.push(*id);
            self.data.extend_from_slice(&normalized);
        }
        Ok(())
    }

    /// Returns up to `k` `(similarity, chunk id)` pairs, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, i64)>, RagError> {
        if query.len() != self.dimension {
            return Err(RagError::Dimension {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if k == 0 || self.ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = l2_normalize(query.to_vec());
        let mut scored: Vec<(f32, i64)> = self
            .ids
            .iter()
            .enumerate()
            .map(|(row, id)| {
                let start = row * self.dimension;
                let stored = &self.data[start..start + self.dimension];
                let score = stored
                    .iter()
                    .zip(&query)
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (score, *id)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Scales a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_orders_by_similarity() {
        let mut index = VectorIndex::new(2);
        index
            .add(
                &[1, 2, 3],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .unwrap();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].1, 1);
        assert!((hits[0].0 - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].1, 3);
        assert_eq!(hits[2].1, 2);
    }

    #[test]
    fn stored_vectors_are_normalized() {
        let mut index = VectorIndex::new(2);
        index.add(&[7], &[vec![3.0, 4.0]]).unwrap();
        let hits = index.search(&[3.0, 4.0], 1).unwrap();
        assert!((hits[0].0 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn truncates_to_k() {
        let mut index = VectorIndex::new(2);
        index
            .add(&[1, 2], &[vec![1.0, 0.0], vec![0.9, 0.1]])
            .unwrap();
        let hits = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, 1);
    }

    #[test]
    fn rejects_mismatched_dimension() {
        let mut index = VectorIndex::new(3);
        let err = index.add(&[1], &[vec![1.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            RagError::Dimension {
                expected: 3,
                got: 2
            }
        ));
        let err = index.search(&[1.0], 5).unwrap_err();
        assert!(matches!(err, RagError::Dimension { .. }));
    }
}
