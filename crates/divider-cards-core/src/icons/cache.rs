use moka::future::Cache;

/// In-memory cache of converted icons, keyed by original icon reference.
pub struct IconCache {
    cache: Cache<String, String>,
}

impl IconCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    pub async fn get(&self, src: &str) -> Option<String> {
        self.cache.get(src).await
    }

    pub async fn insert(&self, src: String, data_uri: String) {
        self.cache.insert(src, data_uri).await;
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
