//! Language factories and lazily constructed engine instances
//!
//! Languages are registered as factories keyed by language id. The first
//! `load` of a language constructs and initializes its adapter; every later
//! `load` returns the same [`EngineHandle`]. Concurrent first loads of the
//! same language are serialized on a per-language `OnceCell`, so at most one
//! live adapter exists per language. A load that finishes after an unload
//! has replaced its cell terminates what it built and joins the live one.

use crate::beans::BeanRegistry;
use crate::engine::{EngineContext, ScriptEngine};
use crate::error::BridgeError;
use crate::output::OutputSink;
use crate::source::ScriptSource;
use crate::value::HostValue;
use ahash::AHashMap;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Constructor for a fresh, uninitialized adapter.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn ScriptEngine> + Send + Sync>;

/// A language known to the registry.
#[derive(Clone)]
pub struct LanguageSpec {
    pub id: String,
    pub extensions: Vec<String>,
    pub factory: EngineFactory,
}

impl LanguageSpec {
    pub fn new<F>(id: impl Into<String>, extensions: &[&str], factory: F) -> Self
    where
        F: Fn() -> Box<dyn ScriptEngine> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for LanguageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageSpec")
            .field("id", &self.id)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Lifecycle of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initialized,
    Active,
    Terminated,
}

struct EngineSlot {
    engine: Box<dyn ScriptEngine>,
    state: EngineState,
}

/// Shared handle to a loaded engine instance.
///
/// Requests through one handle are serialized: the adapter is only ever
/// entered by one caller at a time. The lock is not reentrant, so a host
/// object invoked by a script must not send a request back to the handle
/// that is running that script; doing so deadlocks.
#[derive(Clone)]
pub struct EngineHandle {
    language: Arc<str>,
    slot: Arc<Mutex<EngineSlot>>,
}

impl EngineHandle {
    fn new(language: &str, engine: Box<dyn ScriptEngine>) -> Self {
        Self {
            language: Arc::from(language),
            slot: Arc::new(Mutex::new(EngineSlot {
                engine,
                state: EngineState::Initialized,
            })),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn state(&self) -> EngineState {
        self.slot.lock().state
    }

    /// Whether two handles refer to the same engine instance.
    pub fn same_instance(&self, other: &EngineHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    fn with_engine<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut dyn ScriptEngine) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let mut slot = self.slot.lock();
        if slot.state == EngineState::Terminated {
            return Err(BridgeError::IllegalState(format!(
                "{} called on terminated '{}' engine",
                op, self.language
            )));
        }
        slot.state = EngineState::Active;
        tracing::trace!(language = %self.language, op, "dispatching request");
        f(slot.engine.as_mut())
    }

    pub fn exec(&self, source_name: &str, line: u32, column: u32, text: &str) -> Result<(), BridgeError> {
        self.exec_source(&ScriptSource::new(source_name, line, column, text))
    }

    pub fn eval(
        &self,
        source_name: &str,
        line: u32,
        column: u32,
        text: &str,
    ) -> Result<HostValue, BridgeError> {
        self.eval_source(&ScriptSource::new(source_name, line, column, text))
    }

    pub fn iexec(&self, source_name: &str, line: u32, column: u32, text: &str) -> Result<(), BridgeError> {
        self.iexec_source(&ScriptSource::new(source_name, line, column, text))
    }

    pub fn exec_source(&self, source: &ScriptSource) -> Result<(), BridgeError> {
        self.with_engine("exec", |engine| engine.exec(source))
    }

    pub fn eval_source(&self, source: &ScriptSource) -> Result<HostValue, BridgeError> {
        self.with_engine("eval", |engine| engine.eval(source))
    }

    pub fn iexec_source(&self, source: &ScriptSource) -> Result<(), BridgeError> {
        self.with_engine("iexec", |engine| engine.iexec(source))
    }

    pub fn call(
        &self,
        object: Option<&str>,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError> {
        self.with_engine("call", |engine| engine.call(object, method, args))
    }

    pub fn apply(
        &self,
        source: &ScriptSource,
        params: &[String],
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError> {
        self.with_engine("apply", |engine| engine.apply(source, params, args))
    }

    fn terminate(&self) {
        let mut slot = self.slot.lock();
        if slot.state != EngineState::Terminated {
            slot.engine.terminate();
            slot.state = EngineState::Terminated;
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

type InstanceCell = Arc<OnceCell<EngineHandle>>;

/// Factory registry plus the live engine instances built from it.
pub struct EngineRegistry {
    languages: RwLock<AHashMap<String, LanguageSpec>>,
    extensions: RwLock<AHashMap<String, String>>,
    instances: Mutex<AHashMap<String, InstanceCell>>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            languages: RwLock::new(AHashMap::new()),
            extensions: RwLock::new(AHashMap::new()),
            instances: Mutex::new(AHashMap::new()),
        }
    }

    /// Register or replace a language. Live instances are not affected.
    pub fn register_language(&self, spec: LanguageSpec) {
        tracing::debug!(language = %spec.id, extensions = ?spec.extensions, "registering language");
        let mut extensions = self.extensions.write();
        for ext in &spec.extensions {
            extensions.insert(ext.clone(), spec.id.clone());
        }
        self.languages.write().insert(spec.id.clone(), spec);
    }

    /// Forget a language. Returns whether it was registered.
    pub fn deregister_language(&self, language: &str) -> bool {
        self.extensions.write().retain(|_, id| id != language);
        self.languages.write().remove(language).is_some()
    }

    /// Map an additional file extension to an already registered language.
    pub fn add_extension(&self, language: &str, extension: &str) -> Result<(), BridgeError> {
        let mut languages = self.languages.write();
        let spec = languages
            .get_mut(language)
            .ok_or_else(|| BridgeError::UnknownEngine(language.to_string()))?;
        let ext = normalize_extension(extension);
        if !spec.extensions.contains(&ext) {
            spec.extensions.push(ext.clone());
        }
        self.extensions.write().insert(ext, language.to_string());
        Ok(())
    }

    pub fn is_registered(&self, language: &str) -> bool {
        self.languages.read().contains_key(language)
    }

    /// Registered languages, sorted by id.
    pub fn languages(&self) -> Vec<LanguageSpec> {
        let mut specs: Vec<LanguageSpec> = self.languages.read().values().cloned().collect();
        specs.sort_by(|a, b| a.id.cmp(&b.id));
        specs
    }

    /// Languages with a live engine instance, sorted.
    pub fn loaded(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .instances
            .lock()
            .iter()
            .filter(|(_, cell)| cell.get().is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Determine the language of a script from its file extension.
    pub fn language_for_path(&self, path: &Path) -> Result<String, BridgeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .ok_or_else(|| {
                BridgeError::UnknownEngine(format!("no extension on '{}'", path.display()))
            })?;
        self.extensions
            .read()
            .get(&ext)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownEngine(format!("no language for extension '.{}'", ext)))
    }

    /// Return the engine for `language`, constructing it on first use.
    pub fn load(
        &self,
        language: &str,
        beans: &BeanRegistry,
        output: &OutputSink,
        bridge_binding: &str,
    ) -> Result<EngineHandle, BridgeError> {
        loop {
            let cell = {
                let mut instances = self.instances.lock();
                if let Some(handle) = instances.get(language).and_then(|cell| cell.get()) {
                    return Ok(handle.clone());
                }
                Arc::clone(instances.entry(language.to_string()).or_default())
            };

            let handle = cell.get_or_try_init(|| {
                let factory = self
                    .languages
                    .read()
                    .get(language)
                    .map(|spec| Arc::clone(&spec.factory))
                    .ok_or_else(|| BridgeError::UnknownEngine(language.to_string()))?;

                tracing::debug!(language, "constructing scripting engine");
                let mut engine = factory();
                let ctx = EngineContext::new(language, beans.clone(), output.clone(), bridge_binding);
                engine.initialize(ctx)?;
                Ok::<_, BridgeError>(EngineHandle::new(language, engine))
            });

            let handle = match handle {
                Ok(handle) => handle,
                Err(err) => {
                    let mut instances = self.instances.lock();
                    if instances.get(language).is_some_and(|c| c.get().is_none()) {
                        instances.remove(language);
                    }
                    return Err(err);
                }
            };

            // An unload may have dropped the cell while it was being filled.
            let mut instances = self.instances.lock();
            let live = instances.get(language).map(|current| Arc::ptr_eq(current, &cell));
            match live {
                Some(true) => return Ok(handle.clone()),
                None => {
                    instances.insert(language.to_string(), Arc::clone(&cell));
                    return Ok(handle.clone());
                }
                Some(false) => {
                    drop(instances);
                    tracing::debug!(language, "discarding engine built by a superseded load");
                    handle.terminate();
                }
            }
        }
    }

    /// Terminate and drop the instance for `language`, if any.
    pub fn unload(&self, language: &str) -> bool {
        let cell = self.instances.lock().remove(language);
        match cell.and_then(|cell| cell.get().cloned()) {
            Some(handle) => {
                tracing::debug!(language, "terminating scripting engine");
                handle.terminate();
                true
            }
            None => false,
        }
    }

    pub fn unload_all(&self) {
        let cells: Vec<(String, InstanceCell)> = self.instances.lock().drain().collect();
        for (language, cell) in cells {
            if let Some(handle) = cell.get() {
                tracing::debug!(language = %language, "terminating scripting engine");
                handle.terminate();
            }
        }
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("languages", &self.languages.read().keys().collect::<Vec<_>>())
            .field("loaded", &self.loaded())
            .finish()
    }
}
