use std::path::PathBuf;
use std::sync::Arc;

use ytclip_core::catalog::CatalogStore;
use ytclip_core::Extractor;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is a small value.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline coordinator owning the registry, bus, and in-flight jobs.
    pub extractor: Arc<Extractor>,
    /// Recording catalog, when the `[catalog]` config table is present.
    pub catalog: Option<Arc<dyn CatalogStore>>,
    /// Directory served under `/media`.
    pub media_dir: PathBuf,
}

impl AppState {
    pub fn new(extractor: Extractor) -> Self {
        let catalog = extractor.catalog();
        let media_dir = extractor.media_dir().to_path_buf();
        Self {
            extractor: Arc::new(extractor),
            catalog,
            media_dir,
        }
    }
}
