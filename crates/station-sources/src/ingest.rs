//! `IngestController` (§4.4): registry and lifecycle manager for
//! [`crate::AdapterHandle`]s, plus active-source selection.
//!
//! Grounded on `app_core/audio/ingest.py`'s `AudioIngestController`.

use std::sync::Arc;

use station_bus::BroadcastBus;
use station_core::{SourceConfig, SourceStatus};

use crate::adapter::AdapterHandle;
use crate::backend::AudioBackend;

/// Registry + lifecycle manager for a set of [`AdapterHandle`]s sharing one
/// [`BroadcastBus`].
pub struct IngestController {
    bus: Arc<BroadcastBus>,
    backend: Arc<dyn AudioBackend>,
    adapters: Vec<AdapterHandle>,
}

impl IngestController {
    /// Build an empty controller publishing into a fresh bus of the given
    /// name, using `backend` for device-kind capture.
    pub fn new(bus_name: impl Into<String>, backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            bus: BroadcastBus::new(bus_name),
            backend,
            adapters: Vec::new(),
        }
    }

    /// The shared bus all adapters publish into.
    pub fn broadcast_bus(&self) -> &Arc<BroadcastBus> {
        &self.bus
    }

    /// Register a new source from its configuration. Returns `false` if a
    /// source with this name is already registered.
    pub fn add(&mut self, config: SourceConfig) -> bool {
        if self.adapters.iter().any(|a| a.name() == config.name) {
            return false;
        }
        self.adapters.push(AdapterHandle::new(config, Arc::clone(&self.bus), Arc::clone(&self.backend)));
        true
    }

    /// Unregister and stop a source by name. Returns `false` if not found.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(idx) = self.adapters.iter().position(|a| a.name() == name) else {
            return false;
        };
        let mut adapter = self.adapters.remove(idx);
        adapter.stop();
        true
    }

    /// Start the named source.
    pub fn start(&mut self, name: &str) -> bool {
        self.find_mut(name).is_some_and(AdapterHandle::start)
    }

    /// Stop the named source.
    pub fn stop(&mut self, name: &str) {
        if let Some(adapter) = self.find_mut(name) {
            adapter.stop();
        }
    }

    /// Start every registered source.
    pub fn start_all(&mut self) {
        for adapter in &mut self.adapters {
            adapter.start();
        }
    }

    /// Stop every registered source.
    pub fn stop_all(&mut self) {
        for adapter in &mut self.adapters {
            adapter.stop();
        }
    }

    /// Among sources with status Running and enabled, the one with the
    /// lowest priority number; stable under ties by insertion order (§4.4).
    pub fn active_source(&self) -> Option<&str> {
        self.adapters
            .iter()
            .filter(|a| a.enabled() && a.status() == SourceStatus::Running)
            .min_by_key(|a| a.priority())
            .map(AdapterHandle::name)
    }

    /// If the named adapter is enabled but not Running, request a restart
    /// (§4.4). Returns `false` if the source is unknown, disabled, or the
    /// restart call itself failed.
    pub fn ensure_running(&mut self, name: &str, reason: &str) -> bool {
        let Some(adapter) = self.find_mut(name) else {
            return false;
        };
        if !adapter.enabled() {
            return false;
        }
        if adapter.status() == SourceStatus::Running {
            return true;
        }
        adapter.restart(reason)
    }

    /// Look up a registered adapter by name.
    pub fn get(&self, name: &str) -> Option<&AdapterHandle> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    /// All registered adapter names, in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(AdapterHandle::name).collect()
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut AdapterHandle> {
        self.adapters.iter_mut().find(|a| a.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpal_backend::CpalBackend;
    use std::collections::HashMap;
    use station_core::SourceKind;

    fn config(name: &str, priority: u32) -> SourceConfig {
        SourceConfig {
            name: name.into(),
            kind: SourceKind::File,
            enabled: true,
            priority,
            sample_rate_hz: 48_000,
            channels: 1,
            buffer_frames: 512,
            silence_threshold_db: -60.0,
            silence_duration_s: 1.0,
            kind_specific: HashMap::new(),
        }
    }

    fn controller() -> IngestController {
        IngestController::new("test-bus", Arc::new(CpalBackend::new()))
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut controller = controller();
        assert!(controller.add(config("wx1", 1)));
        assert!(!controller.add(config("wx1", 2)));
    }

    #[test]
    fn remove_unknown_source_returns_false() {
        let mut controller = controller();
        assert!(!controller.remove("missing"));
    }

    #[test]
    fn active_source_is_none_when_nothing_running() {
        let mut controller = controller();
        controller.add(config("wx1", 1));
        assert!(controller.active_source().is_none());
    }

    #[test]
    fn names_reflects_insertion_order() {
        let mut controller = controller();
        controller.add(config("wx1", 5));
        controller.add(config("wx2", 1));
        assert_eq!(controller.names(), vec!["wx1", "wx2"]);
    }

    #[test]
    fn ensure_running_on_unknown_source_returns_false() {
        let mut controller = controller();
        assert!(!controller.ensure_running("missing", "test"));
    }

    #[test]
    fn ensure_running_on_disabled_source_returns_false() {
        let mut controller = controller();
        let mut cfg = config("wx1", 1);
        cfg.enabled = false;
        controller.add(cfg);
        assert!(!controller.ensure_running("wx1", "test"));
    }
}
