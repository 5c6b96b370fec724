//! Single-flight lazy loading

use fiet_types::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A value loaded at most once until reset
///
/// Concurrent callers of [`LoadOnce::get_or_load`] wait on the same load.
/// A failed load leaves the slot empty so the next caller tries again.
pub struct LoadOnce<T> {
    value: RwLock<Option<Arc<T>>>,
    gate: tokio::sync::Mutex<()>,
}

impl<T> LoadOnce<T> {
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.value.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.value.read().is_some()
    }

    pub fn reset(&self) {
        *self.value.write() = None;
    }

    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let _gate = self.gate.lock().await;
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let value = Arc::new(load().await?);
        *self.value.write() = Some(value.clone());
        Ok(value)
    }
}

impl<T> Default for LoadOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Independent [`LoadOnce`] slots addressed by key
///
/// Each key has its own single-flight load; loading one key never blocks
/// or satisfies another.
pub struct KeyedLoadOnce<T> {
    slots: Mutex<HashMap<String, Arc<LoadOnce<T>>>>,
}

impl<T> KeyedLoadOnce<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &str) -> Arc<LoadOnce<T>> {
        self.slots
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let slot = self.slots.lock().get(key).cloned()?;
        slot.get()
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Forget the value loaded for `key`
    pub fn remove(&self, key: &str) {
        self.slots.lock().remove(key);
    }

    /// Forget every loaded value
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.slot(key).get_or_load(load).await
    }
}

impl<T> Default for KeyedLoadOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiet_types::FietError;
    use fiet_types::Stage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let once = Arc::new(LoadOnce::<u32>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let once = once.clone();
                let loads = loads.clone();
                tokio::spawn(async move {
                    once.get_or_load(|| async {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(42)
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(*task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_stays_empty() {
        let once = LoadOnce::<u32>::new();

        let err = once
            .get_or_load(|| async { Err(FietError::invalid_response(Stage::TransferInfo, "boom")) })
            .await;
        assert!(err.is_err());
        assert!(!once.is_loaded());

        once.get_or_load(|| async { Ok(1) }).await.unwrap();
        assert!(once.is_loaded());

        once.reset();
        assert!(once.get().is_none());
    }

    #[tokio::test]
    async fn test_keys_load_independently() {
        let keyed = KeyedLoadOnce::<&'static str>::new();

        keyed.get_or_load("a.example", || async { Ok("a") }).await.unwrap();
        assert!(keyed.is_loaded("a.example"));
        assert!(!keyed.is_loaded("b.example"));

        let b = keyed.get_or_load("b.example", || async { Ok("b") }).await.unwrap();
        assert_eq!(*b, "b");
        assert_eq!(keyed.get("a.example").as_deref(), Some(&"a"));

        keyed.remove("a.example");
        assert!(!keyed.is_loaded("a.example"));
        assert!(keyed.is_loaded("b.example"));

        keyed.clear();
        assert!(keyed.get("b.example").is_none());
    }
}
