//! Inner-product nearest-neighbor index over unit-norm embeddings, with a
//! persisted positional metadata sidecar.
//!
//! A hand-rolled flat index: vectors are stored row-major in a single
//! `Vec<f32>`, scored against the query by full scan. This keeps the
//! on-disk format and the sidecar-length invariant simple and explicit,
//! rather than delegating to an ANN library with its own index/metadata
//! model.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Result, SecondBrainError};
use crate::types::VectorMeta;

const SENTINEL_ROW: i64 = -1;

pub struct VectorIndex {
    dim: usize,
    vectors: Vec<f32>, // row-major, ntotal * dim
    meta: Vec<VectorMeta>,
}

impl VectorIndex {
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
            meta: Vec::new(),
        }
    }

    pub fn ntotal(&self) -> usize {
        self.meta.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Unit-normalize each vector in place, construct the flat index, and
    /// store the metadata sidecar. The sidecar length must equal the
    /// number of vectors.
    pub fn build(dim: usize, mut vectors: Vec<Vec<f32>>, meta: Vec<VectorMeta>) -> Result<Self> {
        if vectors.len() != meta.len() {
            return Err(SecondBrainError::IndexCoherence(format!(
                "vector count {} does not match metadata count {}",
                vectors.len(),
                meta.len()
            )));
        }
        for v in vectors.iter_mut() {
            if v.len() != dim {
                return Err(SecondBrainError::IndexCoherence(format!(
                    "vector dimension {} does not match expected {}",
                    v.len(),
                    dim
                )));
            }
            normalize_in_place(v);
        }

        let mut flat = Vec::with_capacity(vectors.len() * dim);
        for v in vectors {
            flat.extend_from_slice(&v);
        }

        Ok(Self {
            dim,
            vectors: flat,
            meta,
        })
    }

    /// Persist the index to `path` (raw little-endian f32 rows, preceded by
    /// a `(dim: u32, ntotal: u32)` header) and the sidecar to
    /// `path + ".meta.json"`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::File::create(path)?;
        file.write_all(&(self.dim as u32).to_le_bytes())?;
        file.write_all(&(self.ntotal() as u32).to_le_bytes())?;
        for value in &self.vectors {
            file.write_all(&value.to_le_bytes())?;
        }

        let sidecar_path = sidecar_path(path);
        let json = serde_json::to_vec(&self.meta)?;
        std::fs::write(sidecar_path, json)?;

        Ok(())
    }

    /// Load the index from `path`. `dim` is taken from the loaded file. If
    /// the sidecar length does not equal `ntotal`, the load fails with
    /// `IndexCoherence` — the caller is expected to rebuild.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut header = [0u8; 8];
        file.read_exact(&mut header)?;
        let dim = u32::from_le_bytes(header[0..4].try_into().unwrap()) as usize;
        let ntotal = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;

        let mut rest = Vec::new();
        file.read_to_end(&mut rest)?;
        let expected_bytes = ntotal * dim * std::mem::size_of::<f32>();
        if rest.len() != expected_bytes {
            return Err(SecondBrainError::IndexCoherence(format!(
                "vector file has {} bytes, expected {}",
                rest.len(),
                expected_bytes
            )));
        }

        let mut vectors = Vec::with_capacity(ntotal * dim);
        for chunk in rest.chunks_exact(4) {
            vectors.push(f32::from_le_bytes(chunk.try_into().unwrap()));
        }

        let sidecar_path = sidecar_path(path);
        let sidecar_bytes = std::fs::read(&sidecar_path)?;
        let meta: Vec<VectorMeta> = serde_json::from_slice(&sidecar_bytes)?;

        if meta.len() != ntotal {
            return Err(SecondBrainError::IndexCoherence(format!(
                "sidecar length {} does not match index ntotal {}",
                meta.len(),
                ntotal
            )));
        }

        Ok(Self { dim, vectors, meta })
    }

    /// Unit-normalize the query and return up to `k` rows with their
    /// inner-product scores, sorted descending.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut q = query.to_vec();
        normalize_in_place(&mut q);

        let mut scored: Vec<(usize, f32)> = (0..self.ntotal())
            .map(|row| (row, inner_product(&q, self.row(row))))
            .filter(|&(row, _)| row as i64 != SENTINEL_ROW)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    pub fn meta(&self, row: usize) -> &VectorMeta {
        &self.meta[row]
    }

    fn row(&self, row: usize) -> &[f32] {
        &self.vectors[row * self.dim..(row + 1) * self.dim]
    }
}

fn sidecar_path(path: &Path) -> std::path::PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".meta.json");
    std::path::PathBuf::from(p)
}

fn normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(i: usize) -> VectorMeta {
        VectorMeta {
            chunk_id: uuid::Uuid::new_v4(),
            doc_id: uuid::Uuid::new_v4(),
            chunk_index: i as i64,
            page_start: None,
            page_end: None,
            section: None,
        }
    }

    #[test]
    fn build_rejects_mismatched_lengths() {
        let vectors = vec![vec![1.0, 0.0]];
        let meta = vec![meta(0), meta(1)];
        assert!(VectorIndex::build(2, vectors, meta).is_err());
    }

    #[test]
    fn search_returns_exact_match_first() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]];
        let meta = vec![meta(0), meta(1), meta(2)];
        let index = VectorIndex::build(2, vectors, meta).unwrap();

        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn search_on_empty_index_returns_empty() {
        let index = VectorIndex::empty(4);
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.faiss");

        let vectors = vec![vec![3.0, 4.0], vec![1.0, 0.0]];
        let meta = vec![meta(0), meta(1)];
        let index = VectorIndex::build(2, vectors, meta).unwrap();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.ntotal(), 2);
        assert_eq!(loaded.dim(), 2);
        let results = loaded.search(&[1.0, 0.0], 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn load_fails_when_sidecar_length_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.faiss");

        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let meta = vec![meta(0), meta(1)];
        let index = VectorIndex::build(2, vectors, meta).unwrap();
        index.save(&path).unwrap();

        // Corrupt the sidecar to have one fewer entry than the index.
        let sidecar = sidecar_path(&path);
        let mut entries: Vec<serde_json::Value> =
            serde_json::from_slice(&std::fs::read(&sidecar).unwrap()).unwrap();
        entries.pop();
        std::fs::write(&sidecar, serde_json::to_vec(&entries).unwrap()).unwrap();

        assert!(VectorIndex::load(&path).is_err());
    }
}
