//! Union-find partitioning of items by pairwise embedding similarity.

use crate::{Error, Result, index::cosine_similarity};

/// Index-based disjoint-set forest with path compression.
#[derive(Debug, Clone)]
pub struct UnionFind {
  parent: Vec<usize>,
}

impl UnionFind {
  pub fn new(len: usize) -> Self {
    Self { parent: (0..len).collect() }
  }

  pub fn find(&mut self, x: usize) -> usize {
    let mut root = x;
    while self.parent[root] != root {
      root = self.parent[root];
    }
    let mut cur = x;
    while self.parent[cur] != root {
      let next = self.parent[cur];
      self.parent[cur] = root;
      cur = next;
    }
    root
  }

  /// Attach the root of `b` under the root of `a`.
  pub fn union(&mut self, a: usize, b: usize) {
    let (ra, rb) = (self.find(a), self.find(b));
    if ra != rb {
      self.parent[rb] = ra;
    }
  }
}

/// One connected component produced by [`semantic_groups`].
#[derive(Debug, Clone, PartialEq)]
pub struct Group<T> {
  /// Position of the union-find root among the input items.
  pub root:    usize,
  /// Members in input order.
  pub members: Vec<T>,
}

/// Partition `items` so that any two whose vectors have cosine similarity
/// `>= threshold` share a group, closed under transitivity.
///
/// Groups are returned in order of their first member; members keep input
/// order. `vectors[i]` belongs to `items[i]`.
pub fn semantic_groups<T>(
  items: Vec<T>,
  vectors: &[Vec<f32>],
  threshold: f32,
) -> Result<Vec<Group<T>>> {
  if items.len() != vectors.len() {
    return Err(Error::DimensionMismatch {
      expected: items.len(),
      actual:   vectors.len(),
    });
  }

  let n = items.len();
  let mut uf = UnionFind::new(n);
  for i in 0..n {
    for j in (i + 1)..n {
      if cosine_similarity(&vectors[i], &vectors[j])? >= threshold {
        uf.union(i, j);
      }
    }
  }

  let mut groups: Vec<Group<T>> = Vec::new();
  for (i, item) in items.into_iter().enumerate() {
    let root = uf.find(i);
    match groups.iter_mut().find(|g| g.root == root) {
      Some(group) => group.members.push(item),
      None => groups.push(Group { root, members: vec![item] }),
    }
  }
  Ok(groups)
}
