//! Top-level façade over the bean and engine registries

use crate::beans::{Bean, BeanRegistry};
use crate::engine::BRIDGE_BINDING;
use crate::error::BridgeError;
use crate::output::OutputSink;
use crate::registry::{EngineHandle, EngineRegistry, LanguageSpec};
use crate::source::ScriptSource;
use crate::value::{BeanType, HostValue};
use scriptbridge_config::Config;
use std::io::Write;
use std::path::Path;

/// Owns the bean registry and the engine registry, and routes requests to
/// engines by language id.
#[derive(Debug)]
pub struct Manager {
    beans: BeanRegistry,
    engines: EngineRegistry,
    output: OutputSink,
    bridge_binding: String,
    disabled: Vec<String>,
    extra_extensions: Vec<(String, String)>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self {
            beans: BeanRegistry::new(),
            engines: EngineRegistry::new(),
            output: OutputSink::stdout(),
            bridge_binding: BRIDGE_BINDING.to_string(),
            disabled: Vec::new(),
            extra_extensions: Vec::new(),
        }
    }

    /// Build a manager honoring the binding name, disabled languages and
    /// extra file extensions from `config`.
    ///
    /// Language settings apply to engines registered afterwards.
    pub fn from_config(config: &Config) -> Self {
        let mut manager = Self::new();
        manager.bridge_binding = config.bridge_binding().to_string();
        for (id, lang) in &config.languages {
            if !lang.enabled {
                manager.disabled.push(id.clone());
            }
            for ext in &lang.extensions {
                manager.extra_extensions.push((id.clone(), ext.clone()));
            }
        }
        manager
    }

    /// Make `spec` available to `load_scripting_engine`.
    ///
    /// Languages disabled in the configuration are ignored.
    pub fn register_scripting_engine(&self, spec: LanguageSpec) {
        if self.disabled.iter().any(|id| *id == spec.id) {
            tracing::debug!(language = %spec.id, "language disabled by configuration");
            return;
        }
        let id = spec.id.clone();
        self.engines.register_language(spec);
        for (lang, ext) in &self.extra_extensions {
            if *lang == id {
                if let Err(e) = self.engines.add_extension(&id, ext) {
                    tracing::warn!(language = %id, "failed to map extension: {}", e);
                }
            }
        }
    }

    pub fn load_scripting_engine(&self, language: &str) -> Result<EngineHandle, BridgeError> {
        self.engines
            .load(language, &self.beans, &self.output, &self.bridge_binding)
    }

    /// Terminate the engine for `language`. Returns whether one was loaded.
    pub fn unload_scripting_engine(&self, language: &str) -> bool {
        self.engines.unload(language)
    }

    pub fn is_language_registered(&self, language: &str) -> bool {
        self.engines.is_registered(language)
    }

    pub fn languages(&self) -> Vec<LanguageSpec> {
        self.engines.languages()
    }

    pub fn loaded_languages(&self) -> Vec<String> {
        self.engines.loaded()
    }

    pub fn language_for_path(&self, path: &Path) -> Result<String, BridgeError> {
        self.engines.language_for_path(path)
    }

    pub fn eval(
        &self,
        language: &str,
        source_name: &str,
        line: u32,
        column: u32,
        text: &str,
    ) -> Result<HostValue, BridgeError> {
        self.load_scripting_engine(language)?
            .eval(source_name, line, column, text)
    }

    pub fn exec(
        &self,
        language: &str,
        source_name: &str,
        line: u32,
        column: u32,
        text: &str,
    ) -> Result<(), BridgeError> {
        self.load_scripting_engine(language)?
            .exec(source_name, line, column, text)
    }

    pub fn iexec(
        &self,
        language: &str,
        source_name: &str,
        line: u32,
        column: u32,
        text: &str,
    ) -> Result<(), BridgeError> {
        self.load_scripting_engine(language)?
            .iexec(source_name, line, column, text)
    }

    #[expect(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        language: &str,
        source_name: &str,
        line: u32,
        column: u32,
        body: &str,
        params: &[String],
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError> {
        let source = ScriptSource::new(source_name, line, column, body);
        self.load_scripting_engine(language)?
            .apply(&source, params, args)
    }

    pub fn register_bean(&self, name: &str, value: impl Into<HostValue>) {
        self.beans.register(name, value);
    }

    pub fn unregister_bean(&self, name: &str) {
        self.beans.unregister(name);
    }

    pub fn declare_bean(&self, name: &str, value: impl Into<HostValue>, bean_type: BeanType) {
        self.beans.declare(name, value, bean_type);
    }

    pub fn undeclare_bean(&self, name: &str) {
        self.beans.undeclare(name);
    }

    pub fn lookup_bean(&self, name: &str) -> Option<Bean> {
        self.beans.lookup(name)
    }

    pub fn beans(&self) -> &BeanRegistry {
        &self.beans
    }

    /// Send script output of every engine to `writer`.
    pub fn set_output(&self, writer: impl Write + Send + 'static) {
        self.output.redirect(writer);
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn bridge_binding(&self) -> &str {
        &self.bridge_binding
    }

    /// Terminate every loaded engine.
    pub fn terminate(&self) {
        self.engines.unload_all();
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.engines.unload_all();
    }
}
