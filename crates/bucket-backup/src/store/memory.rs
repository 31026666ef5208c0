use std::{
    collections::BTreeMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use super::{HeadOutcome, ObjectStore, StoreError};

/// An in-process object store.
///
/// Counts every call and can be told to fail, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_uploads: Mutex<Vec<String>>,
    failing_heads: AtomicBool,
    head_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload to a key containing `pattern` fail.
    pub fn fail_uploads_containing(&self, pattern: &str) {
        self.failing_uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pattern.to_string());
    }

    /// Make every existence check fail.
    pub fn fail_heads(&self) {
        self.failing_heads.store(true, Ordering::SeqCst);
    }

    /// The contents of the object at `key`.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Every stored key in order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// The number of existence checks made.
    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    /// The number of uploads attempted.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// The number of calls of any kind.
    pub fn calls(&self) -> usize {
        self.head_calls() + self.put_calls()
    }
}

impl ObjectStore for MemoryStore {
    fn head_object(&self, key: &str) -> HeadOutcome {
        self.head_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_heads.load(Ordering::SeqCst) {
            return HeadOutcome::TransportError(StoreError::Request(
                "check",
                key.to_string(),
                "simulated failure".to_string(),
            ));
        }

        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        if objects.contains_key(key) {
            HeadOutcome::Found
        } else {
            HeadOutcome::NotFound
        }
    }

    fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failing_uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|pattern| key.contains(pattern.as_str()));
        if should_fail {
            return Err(StoreError::Request(
                "upload",
                key.to_string(),
                "simulated failure".to_string(),
            ));
        }

        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), body);

        Ok(())
    }
}
