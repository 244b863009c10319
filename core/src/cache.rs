use tokio::sync::RwLock;

/// A whole-collection cache owned by the service that fills it.
///
/// The owner invalidates after every write it performs; writes made by other
/// processes are only picked up after `invalidate` or a fresh instance.
#[derive(Debug)]
pub struct ListCache<T> {
    items: RwLock<Option<Vec<T>>>,
}

impl<T> Default for ListCache<T> {
    fn default() -> Self {
        Self { items: RwLock::new(None) }
    }
}

impl<T: Clone> ListCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Vec<T>> {
        self.items.read().await.clone()
    }

    pub async fn fill(&self, items: Vec<T>) {
        *self.items.write().await = Some(items);
    }

    pub async fn invalidate(&self) {
        self.items.write().await.take();
    }

    pub async fn is_warm(&self) -> bool {
        self.items.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_cold_and_invalidates() {
        let cache = ListCache::<u32>::new();
        assert!(cache.get().await.is_none());
        cache.fill(vec![1, 2]).await;
        assert!(cache.is_warm().await);
        assert_eq!(cache.get().await, Some(vec![1, 2]));
        cache.invalidate().await;
        assert!(!cache.is_warm().await);
    }

    #[tokio::test]
    async fn empty_list_is_still_a_hit() {
        let cache = ListCache::<u32>::new();
        cache.fill(Vec::new()).await;
        assert_eq!(cache.get().await, Some(Vec::new()));
    }
}
