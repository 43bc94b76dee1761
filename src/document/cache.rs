// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-document cache of resolved code objects.
//!
//! Each key moves through `Absent → Resolving → Fresh → Stale → Resolving`.
//! Reads of an absent or stale entry rebuild it synchronously on the calling
//! thread. At most one rebuild per key is in flight; concurrent readers block
//! until it lands and share its outcome.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::error::ResolutionError;
use crate::resolver::{ResolverRegistry, SourceAccess};
use crate::types::{Environment, EnvironmentHandle, FileKey};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::types::{DocumentInfo, EntryState};

struct Slot {
    state: EntryState,
    info: Option<Arc<DocumentInfo>>,
    /// Version of the rebuild in flight, if any.
    pending: Option<u64>,
    /// Set when the entry is invalidated while a rebuild is in flight.
    invalidated: bool,
}

impl Slot {
    fn resolving(version: u64, info: Option<Arc<DocumentInfo>>) -> Self {
        Self {
            state: EntryState::Resolving,
            info,
            pending: Some(version),
            invalidated: false,
        }
    }
}

/// Thread-safe cache of [`DocumentInfo`] keyed by [`FileKey`].
pub struct DocumentInfoCache {
    source: Arc<dyn SourceAccess>,
    registry: Arc<ResolverRegistry>,
    environment: EnvironmentHandle,
    slots: Mutex<HashMap<FileKey, Slot>>,
    landed: Condvar,
    /// Version counter shared by every rebuild.
    version: AtomicU64,
}

impl DocumentInfoCache {
    pub fn new(
        source: Arc<dyn SourceAccess>,
        registry: Arc<ResolverRegistry>,
        environment: EnvironmentHandle,
    ) -> Self {
        Self {
            source,
            registry,
            environment,
            slots: Mutex::new(HashMap::new()),
            landed: Condvar::new(),
            version: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FileKey, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the document info for a key, rebuilding it if absent or stale.
    ///
    /// A reader that arrives while an invalidated rebuild is in flight waits
    /// for it to land and then rebuilds again.
    ///
    /// Returns `None` when the file has no resolver or could never be
    /// resolved. After a failed rebuild the last good value is returned.
    pub fn get(&self, key: &FileKey) -> Option<Arc<DocumentInfo>> {
        let mut slots = self.lock();

        loop {
            match slots.get(key).map(|s| (s.state, s.pending, s.invalidated)) {
                Some((EntryState::Fresh, _, _)) => {
                    return slots.get(key).and_then(|s| s.info.clone())
                }
                Some((EntryState::Resolving, pending, invalidated)) => {
                    slots = self
                        .landed
                        .wait_while(slots, |slots| {
                            slots
                                .get(key)
                                .map(|s| s.pending.is_some() && s.pending == pending)
                                .unwrap_or(false)
                        })
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    // The in-flight result predates the invalidation this
                    // reader already observed; look again.
                    if !invalidated {
                        return slots.get(key).and_then(|s| s.info.clone());
                    }
                }
                Some((EntryState::Stale, _, _)) | None => break,
            }
        }

        let version = self.next_version();
        let previous = slots.remove(key).and_then(|s| s.info);
        slots.insert(key.clone(), Slot::resolving(version, previous));
        drop(slots);

        let outcome = self.rebuild(key, version);

        let mut slots = self.lock();
        let result = Self::land(&mut slots, key, version, outcome);
        drop(slots);
        self.landed.notify_all();
        result
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store a rebuild outcome, unless the entry was removed or superseded
    /// while the rebuild ran.
    fn land(
        slots: &mut HashMap<FileKey, Slot>,
        key: &FileKey,
        version: u64,
        outcome: Result<Option<DocumentInfo>, ResolutionError>,
    ) -> Option<Arc<DocumentInfo>> {
        let owned = slots
            .get(key)
            .map(|s| s.pending == Some(version))
            .unwrap_or(false);
        if !owned {
            debug!(file = %key, version, "entry removed during rebuild; discarding result");
            return outcome.ok().flatten().map(Arc::new);
        }

        match outcome {
            Ok(Some(info)) => {
                let info = Arc::new(info);
                if let Some(slot) = slots.get_mut(key) {
                    slot.state = if slot.invalidated {
                        EntryState::Stale
                    } else {
                        EntryState::Fresh
                    };
                    slot.info = Some(Arc::clone(&info));
                    slot.pending = None;
                    slot.invalidated = false;
                }
                Some(info)
            }
            Ok(None) => {
                slots.remove(key);
                None
            }
            Err(err) => {
                let previous = slots.get(key).and_then(|s| s.info.clone());
                match previous {
                    Some(previous) => {
                        warn!(file = %key, error = %err, "rebuild failed; keeping last good version");
                        if let Some(slot) = slots.get_mut(key) {
                            slot.state = EntryState::Stale;
                            slot.pending = None;
                            slot.invalidated = false;
                        }
                        Some(previous)
                    }
                    None => {
                        warn!(file = %key, error = %err, "rebuild failed");
                        slots.remove(key);
                        None
                    }
                }
            }
        }
    }

    /// Read, resolve and enumerate one file. Runs without the map lock.
    #[instrument(level = "debug", skip(self, key), fields(file = %key))]
    fn rebuild(
        &self,
        key: &FileKey,
        version: u64,
    ) -> Result<Option<DocumentInfo>, ResolutionError> {
        let start = Instant::now();
        let environment = self.environment.current();
        let path = key.path();

        let Some(file) = self.source.load(&path)? else {
            debug!(file = %key, "no language for file");
            return Ok(None);
        };
        let Some(resolver) = self.registry.find(&file.language) else {
            debug!(file = %key, language = %file.language, "no resolver for language");
            return Ok(None);
        };

        let methods = panic::catch_unwind(AssertUnwindSafe(|| resolver.methods_in(&file)))
            .map_err(|_| {
                ResolutionError::Internal(format!("resolver '{}' panicked", resolver.name()))
            })??;

        let info = DocumentInfo::new(
            key.clone(),
            methods,
            version,
            environment,
            file.content_hash(),
        );

        debug!(
            file = %key,
            version,
            methods = info.methods.len(),
            environment = %info.environment,
            "document rebuilt"
        );

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("cache.rebuild", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(Some(info))
    }

    /// Mark an entry stale after its file changed.
    ///
    /// An in-flight rebuild will land as stale.
    pub fn on_file_changed(&self, key: &FileKey) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(key) {
            Self::invalidate(slot);
        }
    }

    /// Mark every entry stale and return the keys held.
    pub fn on_environment_changed(&self, environment: &Environment) -> Vec<FileKey> {
        let mut slots = self.lock();
        for slot in slots.values_mut() {
            Self::invalidate(slot);
        }
        let mut keys: Vec<FileKey> = slots.keys().cloned().collect();
        keys.sort();
        debug!(environment = %environment, entries = keys.len(), "cache invalidated");
        keys
    }

    fn invalidate(slot: &mut Slot) {
        match slot.state {
            EntryState::Resolving => slot.invalidated = true,
            EntryState::Fresh | EntryState::Stale => slot.state = EntryState::Stale,
        }
    }

    /// Snapshot of every key currently held.
    pub fn all_keys(&self) -> Vec<FileKey> {
        let mut keys: Vec<FileKey> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Current value without triggering a rebuild.
    pub fn peek(&self, key: &FileKey) -> Option<Arc<DocumentInfo>> {
        self.lock().get(key).and_then(|s| s.info.clone())
    }

    /// Lifecycle state of an entry; `None` when absent.
    pub fn state(&self, key: &FileKey) -> Option<EntryState> {
        self.lock().get(key).map(|s| s.state)
    }

    /// Drop an entry, e.g. when its file is closed.
    pub fn remove(&self, key: &FileKey) {
        let removed = self.lock().remove(key).is_some();
        if removed {
            self.landed.notify_all();
        }
    }

    /// Drop every entry, e.g. when the project is closed.
    pub fn clear(&self) {
        self.lock().clear();
        self.landed.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use crate::resolver::{LanguageResolver, OverlaySourceAccess, SourceFile};
    use crate::types::{CodeObjectId, MethodInfo};

    /// In-memory sources; every path is "python".
    #[derive(Default)]
    struct MemorySource {
        files: Mutex<HashMap<String, String>>,
    }

    impl MemorySource {
        fn set(&self, path: &str, content: &str) {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), content.to_string());
        }

        fn delete(&self, path: &str) {
            self.files.lock().unwrap().remove(path);
        }
    }

    impl SourceAccess for MemorySource {
        fn read(&self, path: &Path) -> Result<String, ResolutionError> {
            let key = path.to_string_lossy().to_string();
            self.files.lock().unwrap().get(&key).cloned().ok_or_else(|| {
                ResolutionError::io(
                    key,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                )
            })
        }

        fn language_tag(&self, path: &Path) -> Option<String> {
            match path.extension().and_then(|e| e.to_str()) {
                Some("txt") => None,
                _ => Some("python".to_string()),
            }
        }
    }

    /// One method per non-empty line; counts calls and can be slowed down.
    struct LineResolver {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl LineResolver {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    impl LanguageResolver for LineResolver {
        fn name(&self) -> &str {
            "lines"
        }

        fn supports(&self, tag: &str) -> bool {
            tag == "python"
        }

        fn methods_in(&self, file: &SourceFile) -> Result<Vec<MethodInfo>, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            let mut offset = 0;
            let mut methods = Vec::new();
            for line in file.content.lines() {
                let name = line.trim();
                if !name.is_empty() {
                    methods.push(MethodInfo {
                        name: name.to_string(),
                        container: "mod".to_string(),
                        id: CodeObjectId::new("mod", name)?,
                        span: offset..offset + line.len(),
                        line: 1,
                    });
                }
                offset += line.len() + 1;
            }
            Ok(methods)
        }
    }

    fn cache_with(
        source: Arc<dyn SourceAccess>,
        resolver: Arc<LineResolver>,
    ) -> (DocumentInfoCache, EnvironmentHandle) {
        let mut builder = ResolverRegistry::builder();
        builder.register_arc(resolver);
        let handle = EnvironmentHandle::new(Environment::new("LOCAL"));
        let cache = DocumentInfoCache::new(source, Arc::new(builder.build()), handle.clone());
        (cache, handle)
    }

    #[test]
    fn test_get_builds_then_serves_fresh() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\nstop\n");
        let resolver = Arc::new(LineResolver::new(Duration::ZERO));
        let (cache, _) = cache_with(source, Arc::clone(&resolver));
        let key = FileKey::from_path("a.py");

        assert!(cache.state(&key).is_none());
        let first = cache.get(&key).unwrap();
        assert_eq!(first.methods.len(), 2);
        assert_eq!(cache.state(&key), Some(EntryState::Fresh));

        let again = cache.get(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_version_increases_after_change() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        let (cache, _) = cache_with(source.clone(), Arc::new(LineResolver::new(Duration::ZERO)));
        let key = FileKey::from_path("a.py");

        let v1 = cache.get(&key).unwrap().version;
        source.set("a.py", "run\nwalk\n");
        cache.on_file_changed(&key);
        assert_eq!(cache.state(&key), Some(EntryState::Stale));

        let info = cache.get(&key).unwrap();
        assert!(info.version > v1);
        assert_eq!(info.methods.len(), 2);
    }

    #[test]
    fn test_concurrent_gets_share_one_rebuild() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        let resolver = Arc::new(LineResolver::new(Duration::from_millis(100)));
        let (cache, _) = cache_with(source, Arc::clone(&resolver));
        let cache = Arc::new(cache);
        let key = FileKey::from_path("a.py");

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let key = key.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.get(&key).map(|info| info.version)
                })
            })
            .collect();

        let versions: Vec<Option<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        let first = versions[0].unwrap();
        assert!(versions.iter().all(|v| *v == Some(first)));
    }

    #[test]
    fn test_change_during_rebuild_lands_stale() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        let resolver = Arc::new(LineResolver::new(Duration::from_millis(150)));
        let (cache, _) = cache_with(source, Arc::clone(&resolver));
        let cache = Arc::new(cache);
        let key = FileKey::from_path("a.py");

        let reader = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            thread::spawn(move || cache.get(&key))
        };
        thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.state(&key), Some(EntryState::Resolving));
        cache.on_file_changed(&key);

        assert!(reader.join().unwrap().is_some());
        assert_eq!(cache.state(&key), Some(EntryState::Stale));
        cache.get(&key);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_get_after_change_during_rebuild_sees_new_content() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "a\nb\nc\n");
        let resolver = Arc::new(LineResolver::new(Duration::from_millis(200)));
        let (cache, _) = cache_with(source.clone(), Arc::clone(&resolver));
        let cache = Arc::new(cache);
        let key = FileKey::from_path("a.py");

        let reader = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            thread::spawn(move || cache.get(&key))
        };
        thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.state(&key), Some(EntryState::Resolving));

        source.set("a.py", "a\nc\n");
        cache.on_file_changed(&key);
        let info = cache.get(&key).unwrap();
        assert_eq!(info.methods.len(), 2);
        assert_eq!(cache.state(&key), Some(EntryState::Fresh));

        // The reader that started first may keep the old result.
        assert_eq!(reader.join().unwrap().unwrap().methods.len(), 3);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_get_after_switch_during_rebuild_uses_new_environment() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        let resolver = Arc::new(LineResolver::new(Duration::from_millis(200)));
        let (cache, handle) = cache_with(source, resolver);
        let cache = Arc::new(cache);
        let key = FileKey::from_path("a.py");

        let reader = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            thread::spawn(move || cache.get(&key))
        };
        thread::sleep(Duration::from_millis(50));

        handle.swap(Environment::new("PROD"));
        cache.on_environment_changed(&Environment::new("PROD"));
        assert_eq!(cache.get(&key).unwrap().environment.name(), "PROD");

        reader.join().unwrap();
        assert_eq!(cache.peek(&key).unwrap().environment.name(), "PROD");
    }

    #[test]
    fn test_environment_change_stamps_new_environment() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        source.set("b.py", "stop\n");
        let (cache, handle) = cache_with(source, Arc::new(LineResolver::new(Duration::ZERO)));
        let a = FileKey::from_path("a.py");
        let b = FileKey::from_path("b.py");

        assert_eq!(cache.get(&a).unwrap().environment.name(), "LOCAL");
        cache.get(&b);

        handle.swap(Environment::new("PROD"));
        let keys = cache.on_environment_changed(&Environment::new("PROD"));
        assert_eq!(keys, vec![a.clone(), b.clone()]);
        assert_eq!(cache.state(&a), Some(EntryState::Stale));

        assert_eq!(cache.get(&a).unwrap().environment.name(), "PROD");
    }

    #[test]
    fn test_removed_method_disappears() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("svc.py");
        std::fs::write(&path, "def a():\n    pass\n").unwrap();

        let overlay = Arc::new(OverlaySourceAccess::new());
        overlay.set_buffer(
            &path,
            "def a():\n    pass\n\ndef b():\n    pass\n\ndef c():\n    pass\n",
        );
        let cache = DocumentInfoCache::new(
            overlay.clone(),
            Arc::new(ResolverRegistry::with_defaults()),
            EnvironmentHandle::new(Environment::new("LOCAL")),
        );
        let key = FileKey::from_path(&path);

        let members = |info: Arc<DocumentInfo>| -> Vec<String> {
            info.methods.iter().map(|m| m.name.clone()).collect()
        };
        assert_eq!(members(cache.get(&key).unwrap()), vec!["a", "b", "c"]);

        overlay.set_buffer(&path, "def a():\n    pass\n\ndef c():\n    pass\n");
        cache.on_file_changed(&key);
        assert_eq!(members(cache.get(&key).unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn test_failed_rebuild_keeps_last_good() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        let (cache, _) = cache_with(source.clone(), Arc::new(LineResolver::new(Duration::ZERO)));
        let key = FileKey::from_path("a.py");

        let good = cache.get(&key).unwrap();
        source.delete("a.py");
        cache.on_file_changed(&key);

        let after = cache.get(&key).unwrap();
        assert_eq!(after.version, good.version);
        assert_eq!(after.methods.len(), 1);
    }

    #[test]
    fn test_failed_first_build_leaves_absent() {
        let source = Arc::new(MemorySource::default());
        let (cache, _) = cache_with(source, Arc::new(LineResolver::new(Duration::ZERO)));
        let key = FileKey::from_path("missing.py");

        assert!(cache.get(&key).is_none());
        assert!(cache.state(&key).is_none());
    }

    #[test]
    fn test_file_without_resolver_gets_no_entry() {
        let source = Arc::new(MemorySource::default());
        source.set("notes.txt", "hello\n");
        let (cache, _) = cache_with(source, Arc::new(LineResolver::new(Duration::ZERO)));

        assert!(cache.get(&FileKey::from_path("notes.txt")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_all_keys_excludes_removed() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        source.set("b.py", "run\n");
        let (cache, _) = cache_with(source, Arc::new(LineResolver::new(Duration::ZERO)));
        let a = FileKey::from_path("a.py");
        let b = FileKey::from_path("b.py");
        cache.get(&a);
        cache.get(&b);

        cache.remove(&a);
        assert_eq!(cache.all_keys(), vec![b]);

        cache.clear();
        assert!(cache.all_keys().is_empty());
    }

    #[test]
    fn test_versions_strictly_increase_across_files() {
        let source = Arc::new(MemorySource::default());
        source.set("a.py", "run\n");
        source.set("b.py", "run\n");
        let (cache, _) = cache_with(source, Arc::new(LineResolver::new(Duration::ZERO)));

        let va = cache.get(&FileKey::from_path("a.py")).unwrap().version;
        let vb = cache.get(&FileKey::from_path("b.py")).unwrap().version;
        assert!(vb > va);
    }
}
