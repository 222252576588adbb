//! Memoized per-layer rasters
//!
//! Drawing-layer pixels are derived data, so a cached raster is only valid
//! for the exact layer content it was rendered from. Entries are keyed by
//! project and layer id and tagged with a SHA-256 of that content and the
//! raster settings it was drawn with; a hash mismatch is a miss.

use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::RasterConfig;
use crate::core::assets::ImageResolver;
use crate::project::{Layer, LayerType, Project, Stroke};
use crate::raster::PixelBuffer;

/// Entries kept by the shared cache before the oldest are evicted
pub const SHARED_CACHE_CAPACITY: usize = 64;

static SHARED_CACHE: LayerRasterCache = LayerRasterCache::new(SHARED_CACHE_CAPACITY);

/// Process-wide cache used by the command facade
pub fn shared_cache() -> &'static LayerRasterCache {
    &SHARED_CACHE
}

#[derive(Debug)]
struct CachedRaster {
    key: String,
    hash: String,
    raster: Arc<PixelBuffer>,
}

/// Content that determines a layer's isolated raster
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum LayerContent<'a> {
    Drawing {
        width: u32,
        height: u32,
        raster: &'a RasterConfig,
        strokes: Vec<&'a Stroke>,
    },
    Image {
        width: u32,
        height: u32,
        source: Option<String>,
    },
}

/// SHA-256 (hex) of everything that affects the layer's own pixels.
///
/// Opacity, blend mode and visibility are applied at composite time and do
/// not change the hash. Image layers are keyed by the resolver's digest of
/// their source, so a local file rewritten in place is a miss.
pub fn layer_content_hash(
    project: &Project,
    layer: &Layer,
    raster: &RasterConfig,
    resolver: &dyn ImageResolver,
) -> String {
    let content = match layer.layer_type {
        LayerType::Drawing => LayerContent::Drawing {
            width: project.width,
            height: project.height,
            raster,
            strokes: project.strokes_for_layer(&layer.id).collect(),
        },
        LayerType::Image => LayerContent::Image {
            width: project.width,
            height: project.height,
            source: layer.image_url.as_deref().map(|url| resolver.source_digest(url)),
        },
    };
    let mut hasher = Sha256::new();
    match serde_json::to_vec(&content) {
        Ok(bytes) => hasher.update(&bytes),
        Err(err) => {
            // Unhashable content never matches a cached entry
            tracing::warn!("Failed to hash layer {}: {}", layer.id, err);
            hasher.update(crate::core::now_millis().to_le_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

fn cache_key(project: &Project, layer: &Layer) -> String {
    format!("{}/{}", project.id, layer.id)
}

/// Bounded cache of isolated layer rasters, safe to share across rayon workers
#[derive(Debug)]
pub struct LayerRasterCache {
    entries: RwLock<Vec<CachedRaster>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LayerRasterCache {
    pub const fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached raster for `layer` if its content hash still matches
    pub fn get(&self, project: &Project, layer: &Layer, hash: &str) -> Option<Arc<PixelBuffer>> {
        let key = cache_key(project, layer);
        let entries = self.entries.read();
        let found = entries
            .iter()
            .find(|e| e.key == key && e.hash == hash)
            .map(|e| Arc::clone(&e.raster));
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Layer cache hit: {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn store(&self, project: &Project, layer: &Layer, hash: String, raster: Arc<PixelBuffer>) {
        if self.capacity == 0 {
            return;
        }
        let key = cache_key(project, layer);
        let mut entries = self.entries.write();
        entries.retain(|e| e.key != key);
        while entries.len() >= self.capacity {
            entries.remove(0);
        }
        entries.push(CachedRaster { key, hash, raster });
    }

    /// Drop the entry for one layer
    pub fn invalidate(&self, project: &Project, layer_id: &str) {
        let key = format!("{}/{}", project.id, layer_id);
        self.entries.write().retain(|e| e.key != key);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        tracing::debug!("Clearing {} cached layer rasters", entries.len());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl Default for LayerRasterCache {
    fn default() -> Self {
        Self::new(SHARED_CACHE_CAPACITY)
    }
}
