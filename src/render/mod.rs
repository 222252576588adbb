//! Project compositing and export
//!
//! Rendering is a pure function of the project: the same project always
//! flattens to the same pixels. Rasters of unchanged layers can be reused
//! through [`LayerRasterCache`].

mod compositor;
mod export;
mod layer_cache;

pub use compositor::{compose, Compositor};
pub use export::{
    export_png, export_thumbnail, export_thumbnail_data_url, export_to_path, thumbnail_size,
};
pub use layer_cache::{layer_content_hash, shared_cache, LayerRasterCache, SHARED_CACHE_CAPACITY};
