/// Undo/redo engine for a block editor host.
///
/// Captures debounced content snapshots, navigates between them, and
/// restores content and caret on the host. Cloning yields another handle
/// to the same history.
use std::sync::{Arc, Weak};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::block::{validate_blocks, Block, InitialContent};
use crate::caret;
use crate::config::HistoryConfig;
use crate::debounce::Coalescer;
use crate::host::EditorHost;
use crate::shortcut::{KeyEvent, ShortcutAction, ShortcutBindings};
use crate::store::{HistoryState, Snapshot, SnapshotStore};

/// Observer invoked with the fresh state after every history change.
pub type UpdateObserver = Arc<dyn Fn(HistoryState) + Send + Sync>;

#[derive(Clone)]
pub struct UndoEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    host: Arc<dyn EditorHost>,
    config: HistoryConfig,
    bindings: ShortcutBindings,
    store: Mutex<SnapshotStore>,
    coalescer: Arc<Coalescer>,
    observer: Option<UpdateObserver>,
    /// Keyboard listener task, while shortcuts are registered.
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for UndoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoEngine")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .field("coalescer", &self.inner.coalescer)
            .field("shortcuts_registered", &self.shortcuts_registered())
            .finish()
    }
}

impl UndoEngine {
    /// Creates an engine with empty history.
    ///
    /// The config is sanitized and its shortcuts resolved once here.
    pub fn new(
        host: Arc<dyn EditorHost>,
        mut config: HistoryConfig,
        observer: Option<UpdateObserver>,
    ) -> Self {
        config.sanitize();
        let bindings = config.resolved_shortcuts();
        Self {
            inner: Arc::new(EngineInner {
                store: Mutex::new(SnapshotStore::new(config.max_history)),
                coalescer: Coalescer::new(config.debounce()),
                host,
                config,
                bindings,
                observer,
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.inner.config
    }

    pub fn bindings(&self) -> &ShortcutBindings {
        &self.inner.bindings
    }

    /// Seeds history with exactly one snapshot and no caret.
    ///
    /// The observer is notified once with the seeded state.
    ///
    /// # Errors
    ///
    /// Returns an error if the content fails validation; history is left
    /// untouched in that case.
    pub fn initialize(&self, content: impl Into<InitialContent>) -> Result<()> {
        let blocks = content.into().into_blocks();
        validate_blocks(&blocks).context("Invalid initial content")?;
        let state = {
            let mut store = self.inner.store.lock();
            store.reset(&blocks);
            store.state()
        };
        tracing::debug!(blocks = blocks.len(), "History initialized");
        self.publish(state);
        Ok(())
    }

    /// Debounced capture trigger; call on every host content-change event.
    ///
    /// Resolves after the capture covering this call has finished.
    ///
    /// # Errors
    ///
    /// Returns the host save failure or content validation failure of
    /// the covering capture attempt.
    pub async fn notify_changed(&self) -> Result<()> {
        let engine = self.clone();
        self.inner
            .coalescer
            .request(move || {
                let engine = engine.clone();
                async move { engine.capture().await }
            })
            .await
    }

    /// Reads host content and pushes a snapshot if it differs from the
    /// current one.
    async fn capture(&self) -> Result<()> {
        let blocks = self
            .inner
            .host
            .save_content()
            .await
            .context("Failed to save editor content")?;
        validate_blocks(&blocks).context("Host returned invalid content")?;

        if !self.inner.store.lock().has_changed(&blocks) {
            tracing::debug!("Content unchanged, skipping snapshot");
            return Ok(());
        }
        let caret = caret::capture(self.inner.host.as_ref());
        let state = {
            let mut store = self.inner.store.lock();
            store.push(&blocks, caret);
            store.state()
        };
        tracing::debug!(position = ?state.position, count = state.count, "Snapshot captured");
        self.publish(state);
        Ok(())
    }

    /// Steps back one snapshot. No-op when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns an error if the host fails to render the restored content.
    pub async fn undo(&self) -> Result<()> {
        self.navigate(ShortcutAction::Undo).await
    }

    /// Steps forward one snapshot. No-op when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns an error if the host fails to render the restored content.
    pub async fn redo(&self) -> Result<()> {
        self.navigate(ShortcutAction::Redo).await
    }

    async fn navigate(&self, action: ShortcutAction) -> Result<()> {
        let snapshot = {
            let mut store = self.inner.store.lock();
            let Some(position) = store.position() else {
                return Ok(());
            };
            let target = match action {
                ShortcutAction::Undo if store.can_undo() => position - 1,
                ShortcutAction::Redo if store.can_redo() => position + 1,
                _ => return Ok(()),
            };
            store.move_to(target);
            store.current().cloned()
        };
        let Some(snapshot) = snapshot else {
            return Ok(());
        };

        self.inner
            .host
            .render_content(snapshot.content())
            .await
            .context("Failed to render restored content")?;
        caret::restore(self.inner.host.as_ref(), snapshot.caret());

        let state = self.state();
        tracing::debug!(?action, position = ?state.position, "History navigated");
        self.publish(state);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.inner.store.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.store.lock().can_redo()
    }

    pub fn state(&self) -> HistoryState {
        self.inner.store.lock().state()
    }

    /// A copy of the snapshot at the current position.
    pub fn current_snapshot(&self) -> Option<Snapshot> {
        self.inner.store.lock().current().cloned()
    }

    /// Blocks of the current snapshot.
    pub fn current_content(&self) -> Option<Vec<Block>> {
        self.current_snapshot().map(|s| s.content().to_vec())
    }

    /// Listens for key events on `events` and runs undo/redo on matches.
    ///
    /// Replaces any previously registered listener. The listener ends
    /// when the channel closes, the engine is dropped, or
    /// `unregister_shortcuts` is called.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register_shortcuts(&self, mut events: broadcast::Receiver<KeyEvent>) {
        let engine = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "Shortcut listener lagged behind");
                        continue;
                    }
                };
                let Some(engine) = upgrade(&engine) else {
                    break;
                };
                let Some(action) = engine.inner.bindings.action_for(&event) else {
                    continue;
                };
                if let Err(e) = engine.navigate(action).await {
                    tracing::warn!("Shortcut {action:?} failed: {e:#}");
                }
            }
        });

        if let Some(previous) = self.inner.listener.lock().replace(task) {
            previous.abort();
        }
    }

    /// Stops listening for key events. No-op when nothing is registered.
    pub fn unregister_shortcuts(&self) {
        if let Some(task) = self.inner.listener.lock().take() {
            task.abort();
        }
    }

    pub fn shortcuts_registered(&self) -> bool {
        self.inner
            .listener
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn publish(&self, state: HistoryState) {
        if let Some(observer) = &self.inner.observer {
            observer(state);
        }
    }
}

fn upgrade(inner: &Weak<EngineInner>) -> Option<UndoEngine> {
    inner.upgrade().map(|inner| UndoEngine { inner })
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(task) = self.listener.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TextPoint;
    use crate::memory::MemoryHost;
    use crate::store::CaretPosition;
    use std::time::Duration;

    fn texts(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .map(|b| b.text().unwrap_or_default().to_string())
            .collect()
    }

    fn engine_with(host: &Arc<MemoryHost>, config: HistoryConfig) -> UndoEngine {
        UndoEngine::new(Arc::clone(host) as Arc<dyn EditorHost>, config, None)
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_sanitizes_config_and_resolves_bindings() {
        let host = Arc::new(MemoryHost::default());
        let config = HistoryConfig {
            debounce_ms: 40,
            max_history: 0,
            ..Default::default()
        };
        let engine = engine_with(&host, config);

        assert_eq!(engine.config().max_history, 1);
        assert_eq!(engine.inner.coalescer.delay(), Duration::from_millis(40));
        assert_eq!(engine.bindings(), &ShortcutBindings::default());
        assert!(engine.bindings().undo.matches(&KeyEvent::new("z").meta()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_engine_navigation_is_noop() {
        let host = Arc::new(MemoryHost::default());
        let engine = engine_with(&host, HistoryConfig::default());
        engine.undo().await.unwrap();
        engine.redo().await.unwrap();
        assert_eq!(engine.state().position, None);
        assert_eq!(host.render_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_rejects_invalid_content() {
        let host = Arc::new(MemoryHost::default());
        let engine = engine_with(&host, HistoryConfig::default());
        let dup = vec![Block::paragraph("1", "a"), Block::paragraph("1", "b")];
        assert!(engine.initialize(dup).is_err());
        assert_eq!(engine.state().count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_records_caret() {
        let host = Arc::new(MemoryHost::new(vec![Block::paragraph("1", "First")]));
        let engine = engine_with(&host, HistoryConfig::default());
        engine.initialize(host.blocks()).unwrap();

        host.set_blocks(vec![Block::paragraph("1", "First!")]);
        host.place_caret(0, TextPoint { node: 0, offset: 6 });
        engine.notify_changed().await.unwrap();

        let snapshot = engine.current_snapshot().unwrap();
        assert_eq!(snapshot.caret(), Some(CaretPosition { block: 0, offset: 6 }));
        assert_eq!(texts(snapshot.content()), vec!["First!"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_restores_caret_of_target_snapshot() {
        let host = Arc::new(MemoryHost::new(vec![Block::paragraph("1", "ab")]));
        let engine = engine_with(&host, HistoryConfig::default());
        engine.initialize(host.blocks()).unwrap();

        host.set_blocks(vec![Block::paragraph("1", "abc")]);
        host.place_caret(0, TextPoint { node: 0, offset: 3 });
        engine.notify_changed().await.unwrap();

        host.set_blocks(vec![Block::paragraph("1", "abcd")]);
        host.place_caret(0, TextPoint { node: 0, offset: 4 });
        engine.notify_changed().await.unwrap();

        engine.undo().await.unwrap();
        assert_eq!(texts(&host.blocks()), vec!["abc"]);
        let selection = host.selection_now().unwrap();
        assert_eq!(selection.end, TextPoint { node: 0, offset: 3 });

        // The seed snapshot has no caret.
        engine.undo().await.unwrap();
        assert_eq!(texts(&host.blocks()), vec!["ab"]);
        assert_eq!(host.selection_now(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_and_unregister_shortcuts() {
        let host = Arc::new(MemoryHost::new(vec![Block::paragraph("1", "a")]));
        let engine = engine_with(&host, HistoryConfig::default());
        engine.initialize(host.blocks()).unwrap();
        host.set_blocks(vec![Block::paragraph("1", "ab")]);
        engine.notify_changed().await.unwrap();

        let (tx, rx) = broadcast::channel(16);
        engine.register_shortcuts(rx);
        assert!(engine.shortcuts_registered());

        tx.send(KeyEvent::new("z").ctrl()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(engine.state().position, Some(0));

        tx.send(KeyEvent::new("Z").ctrl().shift()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(engine.state().position, Some(1));

        engine.unregister_shortcuts();
        assert!(!engine.shortcuts_registered());
        tokio::time::sleep(Duration::from_millis(1)).await;
        let _ = tx.send(KeyEvent::new("z").ctrl());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(engine.state().position, Some(1));
    }
}
