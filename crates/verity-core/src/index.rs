//! Append-only nearest-neighbour index over unit vectors.
//!
//! Stored and query vectors are L2-normalised on the way in, so cosine
//! similarity reduces to a dot product. Search is a linear scan; clusters
//! number in the thousands, not millions.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier issued by [`VectorIndex::add`]. Equal to the insertion
/// position; never reused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntryId(pub u64);

/// The best match returned by [`VectorIndex::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
  pub score: f32,
  pub id:    EntryId,
}

/// Scale `v` to unit length in place. A zero vector is left untouched.
pub fn normalize(v: &mut [f32]) {
  let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
  if norm > 0.0 {
    v.iter_mut().for_each(|x| *x /= norm);
  }
}

/// Cosine similarity of two equal-length vectors. Zero if either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
  if a.len() != b.len() {
    return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
  }
  let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
  let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
  if na == 0.0 || nb == 0.0 {
    return Ok(0.0);
  }
  Ok(dot / (na * nb))
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
  dim:     usize,
  vectors: Vec<Vec<f32>>,
  next_id: u64,
}

impl VectorIndex {
  pub fn new(dim: usize) -> Self {
    Self { dim, vectors: Vec::new(), next_id: 0 }
  }

  pub fn dim(&self) -> usize { self.dim }

  pub fn len(&self) -> usize { self.vectors.len() }

  pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

  /// Fail unless `vector` has exactly the index dimensionality.
  pub fn check_dim(&self, vector: &[f32]) -> Result<()> {
    if vector.len() != self.dim {
      return Err(Error::DimensionMismatch {
        expected: self.dim,
        actual:   vector.len(),
      });
    }
    Ok(())
  }

  /// Append `vector` and return its freshly issued id.
  pub fn add(&mut self, vector: &[f32]) -> Result<EntryId> {
    self.check_dim(vector)?;
    let id = EntryId(self.next_id);
    self.next_id = self.next_id.checked_add(1).ok_or(Error::IndexExhausted)?;

    let mut unit = vector.to_vec();
    normalize(&mut unit);
    self.vectors.push(unit);
    Ok(id)
  }

  /// Highest cosine similarity against every stored vector. On equal
  /// scores the earliest insertion wins. `None` when the index is empty.
  pub fn search(&self, vector: &[f32]) -> Result<Option<Hit>> {
    self.check_dim(vector)?;
    let mut query = vector.to_vec();
    normalize(&mut query);

    let mut best: Option<Hit> = None;
    for (pos, stored) in self.vectors.iter().enumerate() {
      let score: f32 = stored.iter().zip(&query).map(|(a, b)| a * b).sum();
      if best.is_none_or(|b| score > b.score) {
        best = Some(Hit { score, id: EntryId(pos as u64) });
      }
    }
    Ok(best)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_index_has_no_hit() {
    let index = VectorIndex::new(3);
    assert!(index.search(&[1.0, 0.0, 0.0]).unwrap().is_none());
  }

  #[test]
  fn added_vector_matches_itself() {
    let mut index = VectorIndex::new(3);
    index.add(&[0.0, 1.0, 0.0]).unwrap();
    let id = index.add(&[0.6, 0.8, 0.0]).unwrap();

    let hit = index.search(&[0.6, 0.8, 0.0]).unwrap().unwrap();
    assert_eq!(hit.id, id);
    assert!((hit.score - 1.0).abs() < 1e-6);
  }

  #[test]
  fn ids_are_monotonic_and_distinct() {
    let mut index = VectorIndex::new(2);
    let a = index.add(&[1.0, 0.0]).unwrap();
    let b = index.add(&[1.0, 0.0]).unwrap();
    let c = index.add(&[0.0, 1.0]).unwrap();
    assert!(a < b && b < c);
    assert_eq!(index.len(), 3);
  }

  #[test]
  fn ties_go_to_the_first_insertion() {
    let mut index = VectorIndex::new(2);
    let first = index.add(&[1.0, 0.0]).unwrap();
    index.add(&[1.0, 0.0]).unwrap();
    let hit = index.search(&[1.0, 0.0]).unwrap().unwrap();
    assert_eq!(hit.id, first);
  }

  #[test]
  fn inputs_are_normalised() {
    let mut index = VectorIndex::new(2);
    index.add(&[3.0, 4.0]).unwrap();
    let hit = index.search(&[6.0, 8.0]).unwrap().unwrap();
    assert!((hit.score - 1.0).abs() < 1e-6);
  }

  #[test]
  fn dimension_mismatch_is_rejected_on_add_and_search() {
    let mut index = VectorIndex::new(3);
    let err = index.add(&[1.0, 0.0]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    assert!(err.is_fatal());

    let err = index.search(&[1.0, 0.0, 0.0, 0.0]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 4 }));
    assert!(index.is_empty());
  }

  #[test]
  fn cosine_of_zero_vector_is_zero() {
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
    let s = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]).unwrap();
    assert!((s - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
  }
}
