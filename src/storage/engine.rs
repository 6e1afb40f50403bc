// src/storage/engine.rs
use crate::Result;
use std::path::Path;

/// An embedded append-only log store that can rewrite its journal into a
/// minimal snapshot.
#[allow(async_fn_in_trait)]
pub trait LogEngine {
    type Store: LogStore;

    /// Attaches to the log at `path`. Fails if the log is corrupt or unreadable.
    async fn open(&self, path: &Path) -> Result<Self::Store>;
}

#[allow(async_fn_in_trait)]
pub trait LogStore {
    /// Rewrites the log so it holds only the final value of every live key.
    /// Compressing an already compact log leaves it unchanged.
    async fn compress(&mut self) -> Result<()>;

    /// Releases the underlying file. Must be called once per successful open.
    async fn close(self) -> Result<()>;
}

/// Runs open, compress and close against `path`. Close is attempted even when
/// compression fails; the first error wins.
pub async fn compact_file<E: LogEngine>(engine: &E, path: &Path) -> Result<()> {
    let mut store = engine.open(path).await?;
    let compressed = store.compress().await;
    let closed = store.close().await;
    compressed.and(closed)
}
