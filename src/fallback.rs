//! Substitute-source lookup for items the primary provider no longer serves.
//!
//! [`SearchFallback`] runs a flat title search on the secondary provider and
//! takes the first hit. There is no ranking and no retry; a miss or a search
//! error simply means no substitute.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::extract::{ExtractionClient, Metadata, watch_url};

/// Search prefix understood by the engine.
const SEARCH_PREFIX: &str = "ytsearch:";

/// Finds an alternate source URL for a title.
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    /// Returns a source URL for `title`, or `None` when nothing was found.
    async fn resolve(&self, title: &str) -> Option<String>;
}

/// Builds the engine search query for a title.
#[must_use]
pub fn search_query(title: &str) -> String {
    format!("{SEARCH_PREFIX}'{title}'")
}

/// Title search through an [`ExtractionClient`].
pub struct SearchFallback {
    client: Arc<dyn ExtractionClient>,
}

impl SearchFallback {
    /// Creates a resolver that searches through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ExtractionClient>) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for SearchFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchFallback")
            .field("client", &self.client.name())
            .finish()
    }
}

#[async_trait]
impl FallbackResolver for SearchFallback {
    #[instrument(skip(self))]
    async fn resolve(&self, title: &str) -> Option<String> {
        let query = search_query(title);
        let metadata = match self.client.probe(&query, true).await {
            Ok(metadata) => metadata,
            Err(error) => {
                warn!(error = %error, "Fallback search failed");
                return None;
            }
        };

        let hit = match metadata {
            Metadata::Playlist(results) => results.items.into_iter().next().map(|item| item.id),
            Metadata::Video(video) if !video.id.is_empty() => Some(video.id),
            Metadata::Video(_) => None,
        };

        match hit {
            Some(id) => {
                let url = watch_url(&id);
                debug!(url = %url, "Fallback search hit");
                Some(url)
            }
            None => {
                debug!("Fallback search returned no results");
                None
            }
        }
    }
}
