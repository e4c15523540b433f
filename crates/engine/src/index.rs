//! Persistent nearest-neighbor index over chunk vectors.
//!
//! The index is an ordered mapping from chunk id to (vector, chunk metadata).
//! All vectors share one dimension, validated on every insert. On disk the
//! index is two artifacts in one directory: a binary vector file and a JSON
//! metadata sidecar. Saving writes both to temporary files and renames them
//! into place, so a concurrent reader never observes a partially written
//! index. A missing artifact means "no index" (not an error); artifacts that
//! exist but fail to parse or disagree with each other are corrupt.

use crate::types::Chunk;
use lexrag_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Binary vector artifact file name.
pub const VECTORS_FILE: &str = "index.vec";

/// JSON metadata sidecar file name.
pub const CHUNKS_FILE: &str = "chunks.json";

const MAGIC: [u8; 4] = *b"LXVI";
const FORMAT_VERSION: u32 = 1;

/// An entry pairing a chunk's embedding with its metadata.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// In-memory vector index with file-based persistence.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    /// Vector dimension; fixed by the first insert for the index lifetime
    dim: Option<usize>,

    /// Entries ordered by chunk id
    entries: BTreeMap<u64, IndexEntry>,
}

/// Outcome of loading an index from disk.
#[derive(Debug)]
pub enum IndexFile {
    /// Both artifacts existed and parsed
    Present(VectorIndex),

    /// At least one artifact is missing; callers start with an empty index
    Absent,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a fresh index from chunks and their vectors.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> AppResult<Self> {
        let mut index = Self::new();
        index.add(chunks, vectors)?;
        Ok(index)
    }

    /// Incrementally insert chunks with their vectors.
    ///
    /// Fails with `DimensionMismatch` if any vector differs from the index
    /// dimension, and `DuplicateChunkId` if a chunk id is already present.
    /// The index is not modified on failure.
    pub fn add(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> AppResult<()> {
        if chunks.len() != vectors.len() {
            return Err(AppError::Retrieval(format!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        // Validate the whole batch before touching the map
        let mut dim = self.dim;
        for vector in &vectors {
            match dim {
                None => dim = Some(vector.len()),
                Some(expected) if vector.len() != expected => {
                    return Err(AppError::DimensionMismatch {
                        expected,
                        got: vector.len(),
                    });
                }
                Some(_) => {}
            }
        }

        let mut batch_ids = std::collections::HashSet::new();
        for chunk in &chunks {
            if self.entries.contains_key(&chunk.chunk_id) || !batch_ids.insert(chunk.chunk_id) {
                return Err(AppError::DuplicateChunkId(chunk.chunk_id));
            }
        }

        self.dim = dim;
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            self.entries.insert(chunk.chunk_id, IndexEntry { vector, chunk });
        }

        Ok(())
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimension, if any chunks have been inserted.
    pub fn dimensions(&self) -> Option<usize> {
        self.dim
    }

    /// First unused chunk id; new batches are rebased from here.
    pub fn next_chunk_id(&self) -> u64 {
        self.entries
            .keys()
            .next_back()
            .map(|id| id + 1)
            .unwrap_or(0)
    }

    /// Return the `k` chunks most similar to the query vector.
    ///
    /// Similarity is the inner product, equivalent to cosine similarity on
    /// unit vectors. Scores are non-increasing; ties break by ascending chunk
    /// id. Returns fewer than `k` results when the index is smaller, which is
    /// not an error. `k` must be at least 1.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(Chunk, f32)>> {
        if k == 0 {
            return Err(AppError::Retrieval("k must be at least 1".to_string()));
        }

        if let Some(dim) = self.dim {
            if query.len() != dim {
                return Err(AppError::DimensionMismatch {
                    expected: dim,
                    got: query.len(),
                });
            }
        }

        let mut scored: Vec<(u64, f32)> = self
            .entries
            .values()
            .map(|entry| (entry.chunk.chunk_id, dot(query, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        tracing::debug!("Retrieved {} chunks (requested top-{})", scored.len(), k);

        Ok(scored
            .into_iter()
            .map(|(id, score)| (self.entries[&id].chunk.clone(), score))
            .collect())
    }

    /// Persist the index to a directory, atomically.
    ///
    /// Both artifacts are written to temp files in the target directory and
    /// renamed over the destination paths.
    pub fn save(&self, dir: &Path) -> AppResult<()> {
        std::fs::create_dir_all(dir)?;

        let dim = self.dim.unwrap_or(0);

        // Vector artifact: header + per-entry id and vector, little-endian
        let mut buf = Vec::with_capacity(16 + self.entries.len() * (8 + dim * 4));
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(dim as u32).to_le_bytes());
        buf.extend_from_slice(&(self.entries.len() as u64).to_le_bytes());

        for entry in self.entries.values() {
            buf.extend_from_slice(&entry.chunk.chunk_id.to_le_bytes());
            for value in &entry.vector {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }

        let chunks: Vec<&Chunk> = self.entries.values().map(|e| &e.chunk).collect();
        let sidecar = serde_json::to_vec_pretty(&chunks)?;

        write_atomic(dir, VECTORS_FILE, &buf)?;
        write_atomic(dir, CHUNKS_FILE, &sidecar)?;

        tracing::info!(
            "Saved index with {} chunks (dim {}) to {:?}",
            self.entries.len(),
            dim,
            dir
        );

        Ok(())
    }

    /// Load an index from a directory.
    ///
    /// Returns `IndexFile::Absent` when either artifact is missing, and
    /// `AppError::CorruptIndex` when the artifacts exist but fail to parse or
    /// disagree with each other. Callers degrade a corrupt index to absent
    /// after surfacing the warning.
    pub fn load(dir: &Path) -> AppResult<IndexFile> {
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        if !vectors_path.exists() || !chunks_path.exists() {
            tracing::debug!("No persisted index at {:?}", dir);
            return Ok(IndexFile::Absent);
        }

        let buf = std::fs::read(&vectors_path)?;
        let (dim, vectors) = parse_vectors(&buf)?;

        let sidecar = std::fs::read(&chunks_path)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&sidecar)
            .map_err(|e| AppError::CorruptIndex(format!("unreadable metadata sidecar: {}", e)))?;

        if chunks.len() != vectors.len() {
            return Err(AppError::CorruptIndex(format!(
                "artifact mismatch: {} vectors, {} chunk records",
                vectors.len(),
                chunks.len()
            )));
        }

        let mut vector_map: BTreeMap<u64, Vec<f32>> = vectors.into_iter().collect();
        let mut entries = BTreeMap::new();

        for chunk in chunks {
            let vector = vector_map.remove(&chunk.chunk_id).ok_or_else(|| {
                AppError::CorruptIndex(format!(
                    "chunk {} has no vector in the index artifact",
                    chunk.chunk_id
                ))
            })?;
            entries.insert(chunk.chunk_id, IndexEntry { vector, chunk });
        }

        tracing::info!("Loaded index with {} chunks from {:?}", entries.len(), dir);

        Ok(IndexFile::Present(VectorIndex {
            dim: if entries.is_empty() { None } else { Some(dim) },
            entries,
        }))
    }
}

/// Inner product of two vectors.
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Write bytes to a temp file in `dir` and rename it over `name`.
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> AppResult<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dir.join(name))
        .map_err(|e| AppError::Io(e.error))?;
    Ok(())
}

/// Parse the binary vector artifact into (dimension, id/vector pairs).
fn parse_vectors(buf: &[u8]) -> AppResult<(usize, Vec<(u64, Vec<f32>)>)> {
    if buf.len() < 20 {
        return Err(AppError::CorruptIndex(
            "vector artifact too short for header".to_string(),
        ));
    }

    if buf[0..4] != MAGIC {
        return Err(AppError::CorruptIndex(
            "vector artifact has wrong magic bytes".to_string(),
        ));
    }

    let version = u32::from_le_bytes(buf[4..8].try_into().unwrap());
    if version != FORMAT_VERSION {
        return Err(AppError::CorruptIndex(format!(
            "unsupported index format version {}",
            version
        )));
    }

    let dim = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;
    let count = u64::from_le_bytes(buf[12..20].try_into().unwrap()) as usize;

    let entry_size = 8 + dim * 4;
    if buf.len() != 20 + count * entry_size {
        return Err(AppError::CorruptIndex(format!(
            "vector artifact length {} does not match header ({} entries of dim {})",
            buf.len(),
            count,
            dim
        )));
    }

    let mut vectors = Vec::with_capacity(count);
    let mut offset = 20;

    for _ in 0..count {
        let id = u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap());
        offset += 8;

        let mut vector = Vec::with_capacity(dim);
        for _ in 0..dim {
            vector.push(f32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()));
            offset += 4;
        }

        vectors.push((id, vector));
    }

    Ok((dim, vectors))
}
