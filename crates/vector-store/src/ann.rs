use crate::error::{Result, VectorStoreError};
use byteorder::{ByteOrder, LittleEndian};
use ndarray::{Array2, ArrayView1};
use std::path::Path;

const ANN_MAGIC: &[u8; 4] = b"QANN";
const ANN_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 8;

/// Derived nearest-neighbor artifact over the angular (cosine) metric.
///
/// The artifact is a disposable cache built wholesale from a store snapshot:
/// it holds nothing but the row vectors it was built from and is invalid the
/// moment the snapshot changes. It is never patched incrementally. The
/// retrieval engine does not consult it; exact scoring over the snapshot is
/// authoritative and the artifact exists for external consumers of the
/// on-disk layout.
#[derive(Debug)]
pub struct AnnIndex {
    trees: usize,
    vectors: Array2<f32>,
}

impl AnnIndex {
    /// Rebuild the persisted artifact from the full vector set. An empty
    /// matrix produces no artifact and removes any stale one: artifact
    /// presence implies at least one indexed vector.
    pub async fn rebuild(matrix: &Array2<f32>, trees: usize, path: &Path) -> Result<()> {
        if matrix.nrows() == 0 {
            if path.exists() {
                tokio::fs::remove_file(path).await?;
                log::info!("Removed stale ANN artifact {}", path.display());
            }
            return Ok(());
        }

        let bytes = encode(matrix, trees);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("ann.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        log::info!(
            "Rebuilt ANN artifact {} ({} rows, {} trees)",
            path.display(),
            matrix.nrows(),
            trees
        );
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        decode(&bytes)
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn trees(&self) -> usize {
        self.trees
    }

    /// Top-k rows by cosine score against `query`, descending. The flat
    /// layout makes this exact; callers must still treat results as cache.
    pub fn search(&self, query: ArrayView1<'_, f32>, k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(row, vector)| (row, vector.dot(&query)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

fn encode(matrix: &Array2<f32>, trees: usize) -> Vec<u8> {
    let mut bytes = vec![0_u8; HEADER_LEN + matrix.len() * std::mem::size_of::<f32>()];
    bytes[0..4].copy_from_slice(ANN_MAGIC);
    LittleEndian::write_u32(&mut bytes[4..8], ANN_VERSION);
    LittleEndian::write_u32(&mut bytes[8..12], trees as u32);
    LittleEndian::write_u64(&mut bytes[12..20], matrix.nrows() as u64);
    LittleEndian::write_u64(&mut bytes[20..28], matrix.ncols() as u64);
    let values: Vec<f32> = matrix.iter().copied().collect();
    LittleEndian::write_f32_into(&values, &mut bytes[HEADER_LEN..]);
    bytes
}

fn decode(bytes: &[u8]) -> Result<AnnIndex> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != ANN_MAGIC {
        return Err(VectorStoreError::IndexError(
            "not an ANN artifact (bad header)".to_string(),
        ));
    }
    let version = LittleEndian::read_u32(&bytes[4..8]);
    if version != ANN_VERSION {
        return Err(VectorStoreError::IndexError(format!(
            "unsupported ANN artifact version {version} (expected {ANN_VERSION})"
        )));
    }
    let trees = LittleEndian::read_u32(&bytes[8..12]) as usize;
    let rows = usize::try_from(LittleEndian::read_u64(&bytes[12..20]))
        .map_err(|_| VectorStoreError::IndexError("row count overflows usize".to_string()))?;
    let dim = usize::try_from(LittleEndian::read_u64(&bytes[20..28]))
        .map_err(|_| VectorStoreError::IndexError("dimension overflows usize".to_string()))?;

    let expected = HEADER_LEN + rows * dim * std::mem::size_of::<f32>();
    if bytes.len() != expected {
        return Err(VectorStoreError::IndexError(format!(
            "ANN artifact length {} does not match header shape [{rows}, {dim}]",
            bytes.len()
        )));
    }

    let mut values = vec![0.0_f32; rows * dim];
    LittleEndian::read_f32_into(&bytes[HEADER_LEN..], &mut values);
    let vectors = Array2::from_shape_vec((rows, dim), values)?;
    Ok(AnnIndex { trees, vectors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn rebuild_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.ann");
        let matrix = array![[1.0_f32, 0.0], [0.0, 1.0], [0.6, 0.8]];

        AnnIndex::rebuild(&matrix, 50, &path).await.unwrap();
        assert!(path.exists());

        let index = AnnIndex::load(&path).await.unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimension(), 2);
        assert_eq!(index.trees(), 50);
    }

    #[tokio::test]
    async fn empty_matrix_removes_stale_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.ann");

        let matrix = array![[1.0_f32, 0.0]];
        AnnIndex::rebuild(&matrix, 10, &path).await.unwrap();
        assert!(path.exists());

        let empty = Array2::<f32>::zeros((0, 2));
        AnnIndex::rebuild(&empty, 10, &path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_descending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.ann");
        let matrix = array![[1.0_f32, 0.0], [0.0, 1.0], [0.6, 0.8]];
        AnnIndex::rebuild(&matrix, 5, &path).await.unwrap();

        let index = AnnIndex::load(&path).await.unwrap();
        let query = array![1.0_f32, 0.0];
        let hits = index.search(query.view(), 2).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].0, 2);
    }

    #[tokio::test]
    async fn truncated_artifact_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.ann");
        let matrix = array![[1.0_f32, 0.0], [0.0, 1.0]];
        AnnIndex::rebuild(&matrix, 5, &path).await.unwrap();

        let mut bytes = tokio::fs::read(&path).await.unwrap();
        bytes.truncate(bytes.len() - 4);
        tokio::fs::write(&path, bytes).await.unwrap();

        let err = AnnIndex::load(&path).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::IndexError(_)));
    }
}
