use crate::config::StoreConfig;
use crate::error::{Result, VectorStoreError};
use crate::record::RowMeta;
use crate::snapshot::Snapshot;
use byteorder::{ByteOrder, LittleEndian};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::path::Path;

/// Durable row-id -> (vector, provenance) mapping. One instance per store
/// layout; all operations go through an explicit handle, never a global.
///
/// Persistence is a two-artifact write (metadata JSON + binary matrix).
/// Both halves are staged as `.tmp` siblings and renamed into place only
/// after both writes succeed, so a crash mid-save never leaves metadata
/// referencing vector rows that do not exist.
pub struct VectorStore {
    config: StoreConfig,
}

impl VectorStore {
    pub fn open(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Read the persisted snapshot. Missing files mean "empty store" (the
    /// first-run bootstrap state); disagreement between the halves is
    /// `CorruptState` and never silently truncated.
    pub async fn load(&self) -> Result<Snapshot> {
        let meta_exists = self.config.meta_path.exists();
        let matrix_exists = self.config.matrix_path.exists();
        if !meta_exists && !matrix_exists {
            log::debug!(
                "No persisted store at {}; starting empty",
                self.config.meta_path.display()
            );
            return Ok(Snapshot::empty(self.config.dimension));
        }
        if meta_exists != matrix_exists {
            return Err(VectorStoreError::CorruptState(format!(
                "store halves disagree: metadata present={meta_exists}, matrix present={matrix_exists}"
            )));
        }

        let meta_bytes = tokio::fs::read(&self.config.meta_path).await?;
        let rows = decode_meta(&meta_bytes)?;

        let matrix_bytes = tokio::fs::read(&self.config.matrix_path).await?;
        let matrix = decode_matrix(&matrix_bytes, self.config.dimension)?;

        let snapshot = Snapshot::from_parts(matrix, rows)?;
        log::debug!(
            "Loaded store snapshot: {} rows x {} dims",
            snapshot.len(),
            snapshot.dimension()
        );
        Ok(snapshot)
    }

    /// Replace the persisted snapshot wholesale. See the struct docs for the
    /// atomicity contract.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.dimension() != self.config.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.config.dimension,
                actual: snapshot.dimension(),
            });
        }

        let meta_bytes = encode_meta(snapshot.rows())?;
        let matrix_bytes = encode_matrix(snapshot.matrix());

        ensure_parent_dir(&self.config.meta_path).await?;
        ensure_parent_dir(&self.config.matrix_path).await?;

        let meta_tmp = tmp_sibling(&self.config.meta_path);
        let matrix_tmp = tmp_sibling(&self.config.matrix_path);
        tokio::fs::write(&meta_tmp, &meta_bytes).await?;
        tokio::fs::write(&matrix_tmp, &matrix_bytes).await?;

        // Both staged writes succeeded; now make them visible.
        tokio::fs::rename(&meta_tmp, &self.config.meta_path).await?;
        tokio::fs::rename(&matrix_tmp, &self.config.matrix_path).await?;

        log::info!(
            "Saved store snapshot: {} rows to {}",
            snapshot.len(),
            self.config.meta_path.display()
        );
        Ok(())
    }
}

fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".tmp");
    path.with_file_name(name)
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Metadata is a JSON object mapping the stringified row index to its
/// provenance record. Row indices read back as integers must form the dense
/// range `[0, row_count)`.
fn decode_meta(bytes: &[u8]) -> Result<Vec<RowMeta>> {
    let map: BTreeMap<String, RowMeta> = serde_json::from_slice(bytes)?;
    let mut rows: Vec<Option<RowMeta>> = vec![None; map.len()];
    let count = map.len();
    for (raw_index, meta) in map {
        let index: usize = raw_index.parse().map_err(|_| {
            VectorStoreError::CorruptState(format!("non-numeric metadata row index '{raw_index}'"))
        })?;
        if index >= count {
            return Err(VectorStoreError::CorruptState(format!(
                "metadata row index {index} outside dense range [0, {count})"
            )));
        }
        if rows[index].replace(meta).is_some() {
            return Err(VectorStoreError::CorruptState(format!(
                "duplicate metadata row index {index}"
            )));
        }
    }
    // Every slot was filled exactly once, so the unwrap below cannot fire.
    Ok(rows.into_iter().map(|meta| meta.unwrap()).collect())
}

fn encode_meta(rows: &[RowMeta]) -> Result<Vec<u8>> {
    let map: BTreeMap<String, &RowMeta> = rows
        .iter()
        .enumerate()
        .map(|(index, meta)| (index.to_string(), meta))
        .collect();
    Ok(serde_json::to_vec_pretty(&map)?)
}

/// The matrix file is headerless: `row_count * dimension` little-endian f32
/// values. Width comes from the configured dimension; a file that is not a
/// whole number of rows is corrupt.
fn decode_matrix(bytes: &[u8], dimension: usize) -> Result<Array2<f32>> {
    let row_bytes = dimension * std::mem::size_of::<f32>();
    if row_bytes == 0 {
        return Err(VectorStoreError::CorruptState(
            "configured dimension is zero".to_string(),
        ));
    }
    if bytes.len() % row_bytes != 0 {
        return Err(VectorStoreError::CorruptState(format!(
            "matrix file length {} is not a multiple of row width {row_bytes}",
            bytes.len()
        )));
    }
    let rows = bytes.len() / row_bytes;
    let mut values = vec![0.0_f32; rows * dimension];
    LittleEndian::read_f32_into(bytes, &mut values);
    Ok(Array2::from_shape_vec((rows, dimension), values)?)
}

fn encode_matrix(matrix: &Array2<f32>) -> Vec<u8> {
    let mut bytes = vec![0_u8; matrix.len() * std::mem::size_of::<f32>()];
    let values: Vec<f32> = matrix.iter().copied().collect();
    LittleEndian::write_f32_into(&values, &mut bytes);
    bytes
}
