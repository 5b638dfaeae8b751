use crate::error::{Result, VectorStoreError};
use crate::record::RowMeta;
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::HashMap;

/// Divisor clamp for zero-norm vectors so normalization never produces
/// NaN/inf.
pub const NORM_EPSILON: f32 = 1e-9;

/// One consistent view of the persisted store: the embedding matrix plus
/// row-ordered provenance. Metadata row `i` always describes matrix row `i`;
/// the pair is replaced wholesale on every successful append and never
/// partially updated.
#[derive(Debug, Clone)]
pub struct Snapshot {
    matrix: Array2<f32>,
    rows: Vec<RowMeta>,
}

impl Snapshot {
    /// Empty snapshot with the configured dimension. This is the legitimate
    /// first-run state, not an error.
    pub fn empty(dimension: usize) -> Self {
        Self {
            matrix: Array2::zeros((0, dimension)),
            rows: Vec::new(),
        }
    }

    /// Reassemble a snapshot from its persisted halves, revalidating the
    /// row-alignment invariant. Construction does not enforce it, so every
    /// load goes through here.
    pub fn from_parts(matrix: Array2<f32>, rows: Vec<RowMeta>) -> Result<Self> {
        if matrix.nrows() != rows.len() {
            return Err(VectorStoreError::CorruptState(format!(
                "metadata has {} rows but matrix has {}",
                rows.len(),
                matrix.nrows()
            )));
        }
        Ok(Self { matrix, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }

    pub fn rows(&self) -> &[RowMeta] {
        &self.rows
    }

    pub fn row_meta(&self, row: usize) -> Option<&RowMeta> {
        self.rows.get(row)
    }

    pub fn vector(&self, row: usize) -> Option<ArrayView1<'_, f32>> {
        if row < self.matrix.nrows() {
            Some(self.matrix.row(row))
        } else {
            None
        }
    }

    /// key -> newest row id. Superseded rows for a key stay in the store but
    /// lose their map entry: later rows overwrite earlier ones, so reads see
    /// last-writer-wins.
    pub fn key_to_row(&self) -> HashMap<String, usize> {
        let mut map = HashMap::with_capacity(self.rows.len());
        for (row, meta) in self.rows.iter().enumerate() {
            map.insert(meta.key.clone(), row);
        }
        map
    }

    /// Append embedded rows at the next dense row ids. Existing rows are
    /// never touched; `vectors` must already be unit-normalized.
    pub fn append(&mut self, vectors: Array2<f32>, metas: Vec<RowMeta>) -> Result<()> {
        if vectors.nrows() != metas.len() {
            return Err(VectorStoreError::Other(format!(
                "appending {} vectors with {} metadata rows",
                vectors.nrows(),
                metas.len()
            )));
        }
        if vectors.ncols() != self.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension(),
                actual: vectors.ncols(),
            });
        }
        self.matrix.append(Axis(0), vectors.view())?;
        self.rows.extend(metas);
        Ok(())
    }
}

impl From<ndarray::ShapeError> for VectorStoreError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Other(format!("matrix shape error: {err}"))
    }
}

/// L2-normalize every row in place. Zero-norm rows divide by a small epsilon
/// instead of erroring, matching the embedding convention of the store.
pub fn l2_normalize_rows(matrix: &mut Array2<f32>) {
    for mut row in matrix.rows_mut() {
        let norm = row.dot(&row).sqrt();
        let divisor = if norm == 0.0 { NORM_EPSILON } else { norm };
        row.mapv_inplace(|v| v / divisor);
    }
}

/// Build a matrix from raw embedder output, validating width against `dim`.
pub fn matrix_from_vectors(vectors: Vec<Vec<f32>>, dim: usize) -> Result<Array2<f32>> {
    let mut flat = Vec::with_capacity(vectors.len() * dim);
    for vector in &vectors {
        if vector.len() != dim {
            return Err(VectorStoreError::InvalidDimension {
                expected: dim,
                actual: vector.len(),
            });
        }
        flat.extend_from_slice(vector);
    }
    Ok(Array2::from_shape_vec((vectors.len(), dim), flat)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn meta(key: &str, body: &str) -> RowMeta {
        RowMeta {
            key: key.to_string(),
            id: None,
            body: body.to_string(),
            owner: None,
        }
    }

    #[test]
    fn from_parts_rejects_row_count_mismatch() {
        let matrix = array![[1.0_f32, 0.0], [0.0, 1.0]];
        let err = Snapshot::from_parts(matrix, vec![meta("A", "a")]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::VectorStoreError::CorruptState(_)
        ));
    }

    #[test]
    fn key_map_is_last_writer_wins() {
        let matrix = array![[1.0_f32, 0.0], [0.0, 1.0], [1.0, 0.0]];
        let rows = vec![meta("A", "old"), meta("B", "b"), meta("A", "new")];
        let snapshot = Snapshot::from_parts(matrix, rows).unwrap();

        let map = snapshot.key_to_row();
        assert_eq!(map.get("A"), Some(&2));
        assert_eq!(map.get("B"), Some(&1));
        // The superseded row is still present, just no longer authoritative.
        assert_eq!(snapshot.row_meta(0).unwrap().body, "old");
    }

    #[test]
    fn append_keeps_existing_rows_intact() {
        let mut snapshot = Snapshot::empty(2);
        snapshot
            .append(array![[1.0_f32, 0.0]], vec![meta("A", "a")])
            .unwrap();
        snapshot
            .append(array![[0.0_f32, 1.0]], vec![meta("B", "b")])
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.row_meta(0).unwrap().key, "A");
        assert_eq!(snapshot.vector(0).unwrap().to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn normalization_clamps_zero_vectors() {
        let mut matrix = array![[3.0_f32, 4.0], [0.0, 0.0]];
        l2_normalize_rows(&mut matrix);

        assert!((matrix.row(0).dot(&matrix.row(0)).sqrt() - 1.0).abs() < 1e-6);
        assert!(matrix.row(1).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn matrix_from_vectors_checks_width() {
        let err = matrix_from_vectors(vec![vec![1.0, 2.0, 3.0]], 2).unwrap_err();
        assert!(matches!(
            err,
            crate::error::VectorStoreError::InvalidDimension {
                expected: 2,
                actual: 3
            }
        ));
    }
}
