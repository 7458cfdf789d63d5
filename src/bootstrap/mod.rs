//! Client-side math typesetting.
//!
//! Pages carry math as marker elements that a browser engine typesets after
//! the HTML is injected. [`MathBootstrap`] owns the lifecycle of that engine:
//! the configuration is installed and the script injected at most once, no
//! matter how many containers ask for typesetting at the same time.
//!
//! The host document is abstracted behind [`ScriptHost`], so the lifecycle
//! can be driven from a browser binding or from tests.

mod config;

pub use self::config::{
    LoaderConfig, MathJaxConfig, ProcessingOptions, StartupConfig, TexConfig, DEFAULT_CDN_URL,
};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Handle to a container in the host document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("math engine script failed to load: {0}")]
    Script(String),

    #[error("typesetting failed: {0}")]
    Typeset(String),
}

/// A loaded math engine.
pub trait MathEngine: Send + Sync {
    /// Forgets previous typesetting output inside `elements`.
    fn typeset_clear(&self, elements: &[Element]);

    fn typeset<'a>(&'a self, elements: &'a [Element]) -> BoxFuture<'a, Result<(), LoadError>>;
}

/// The document the engine is loaded into.
pub trait ScriptHost: Send + Sync {
    /// False outside a browser-like environment; nothing is loaded then.
    fn has_document(&self) -> bool;

    fn install_config(&self, config: &MathJaxConfig);

    /// Appends an async script element. Resolves when the script has loaded
    /// and fails on its error event.
    fn inject_script(&self, url: &str) -> BoxFuture<'static, Result<(), LoadError>>;

    /// The engine, once it exposes its typesetting entry point.
    fn engine(&self) -> Option<Arc<dyn MathEngine>>;
}

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub cdn_url: String,
    pub poll_interval: Duration,
    /// After this long the load resolves with whatever the host has.
    pub load_timeout: Duration,
    pub config: MathJaxConfig,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            cdn_url: String::from(DEFAULT_CDN_URL),
            poll_interval: Duration::from_millis(50),
            load_timeout: Duration::from_secs(15),
            config: MathJaxConfig::default(),
        }
    }
}

impl BootstrapOptions {
    /// Head markup for pages that typeset on the client.
    pub fn script_tags(&self) -> crate::Result<String> {
        self.config.script_tags(&self.cdn_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
}

type Loaded = Result<Option<Arc<dyn MathEngine>>, LoadError>;
type LoadFuture = Shared<BoxFuture<'static, Loaded>>;

struct Inner {
    state: LoadState,
    pending: Option<LoadFuture>,
    /// Bumped whenever `pending` is dropped, so a stale load finishing late
    /// cannot touch the state of a newer one.
    generation: u64,
}

/// Shared, lazily loaded math engine.
///
/// Cloning yields another handle to the same bootstrap.
#[derive(Clone)]
pub struct MathBootstrap {
    host: Arc<dyn ScriptHost>,
    options: BootstrapOptions,
    inner: Arc<Mutex<Inner>>,
}

impl MathBootstrap {
    pub fn new(host: Arc<dyn ScriptHost>, options: BootstrapOptions) -> Self {
        Self {
            host,
            options,
            inner: Arc::new(Mutex::new(Inner {
                state: LoadState::Unloaded,
                pending: None,
                generation: 0,
            })),
        }
    }

    pub fn options(&self) -> &BootstrapOptions {
        &self.options
    }

    pub fn state(&self) -> LoadState {
        self.lock().state
    }

    /// Forgets any load in progress or done. The next [`load`](Self::load)
    /// starts over.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = LoadState::Unloaded;
        inner.pending = None;
        inner.generation += 1;
    }

    /// Loads the engine once and hands every caller the same result.
    ///
    /// Resolves to `None` without a document, or when the engine did not
    /// appear before the timeout. The injected script may still arrive after
    /// that, so the load stays memoized and later calls only ask the host
    /// again. A failed script rejects every waiting caller and leaves the
    /// bootstrap unloaded so a later call retries.
    pub async fn load(&self) -> Loaded {
        if !self.host.has_document() {
            return Ok(None);
        }

        let (pending, generation) = {
            let mut inner = self.lock();
            let pending = match &inner.pending {
                Some(pending) => pending.clone(),
                None => {
                    let pending = start(self.host.clone(), self.options.clone()).boxed().shared();
                    inner.pending = Some(pending.clone());
                    inner.state = LoadState::Loading;
                    pending
                }
            };
            (pending, inner.generation)
        };

        let loaded = match pending.await {
            Ok(None) => Ok(self.host.engine()),
            loaded => loaded,
        };

        let mut inner = self.lock();
        if inner.generation == generation {
            match &loaded {
                Ok(Some(_)) => inner.state = LoadState::Ready,
                Ok(None) => debug!("math engine still missing after its script loaded"),
                Err(_) => {
                    inner.state = LoadState::Unloaded;
                    inner.pending = None;
                    inner.generation += 1;
                }
            }
        }
        loaded
    }

    /// Clears and typesets `element`. Does nothing without an element or a
    /// document; failures are logged.
    pub async fn typeset(&self, element: Option<&Element>) {
        let Some(element) = element else { return };
        let Some(engine) = self.engine_for_use().await else {
            return;
        };

        let elements = std::slice::from_ref(element);
        engine.typeset_clear(elements);
        if let Err(err) = engine.typeset(elements).await {
            warn!(element = %element.0, %err, "typesetting failed");
        }
    }

    /// Clears typesetting output inside `element`.
    pub async fn clear(&self, element: Option<&Element>) {
        let Some(element) = element else { return };
        if let Some(engine) = self.engine_for_use().await {
            engine.typeset_clear(std::slice::from_ref(element));
        }
    }

    async fn engine_for_use(&self) -> Option<Arc<dyn MathEngine>> {
        match self.load().await {
            Ok(Some(engine)) => Some(engine),
            Ok(None) => {
                debug!("no math engine available, skipping");
                None
            }
            Err(err) => {
                error!(%err, "math engine unavailable");
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn start(host: Arc<dyn ScriptHost>, options: BootstrapOptions) -> Loaded {
    if let Some(engine) = host.engine() {
        return Ok(Some(engine));
    }

    info!(url = %options.cdn_url, "loading math engine");
    host.install_config(&options.config);
    host.inject_script(&options.cdn_url).await?;

    let poll = async {
        let mut ticker = interval(options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(engine) = host.engine() {
                return engine;
            }
        }
    };

    match timeout(options.load_timeout, poll).await {
        Ok(engine) => Ok(Some(engine)),
        Err(_) => {
            warn!(timeout = ?options.load_timeout, "math engine not ready in time");
            Ok(host.engine())
        }
    }
}
