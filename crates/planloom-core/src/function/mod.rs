//! Function registry module
//!
//! This module defines the callable side of a plan:
//! - PluginFunction: The trait every callable implements
//! - FunctionMeta / ParameterSpec: Capability descriptors used for validation
//!   and for describing available functions to a planner
//! - Plugin: A named group of functions registered under `"{Plugin}-{Function}"`
//! - FunctionRegistry: Exact, case-sensitive name lookup

mod args;
mod context;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

pub use args::FunctionArgs;
pub use context::FunctionContext;

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;

/// Failure surfaced by a host-side callable
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
}

impl InvocationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function '{0}' is already registered")]
    Duplicate(String),

    #[error("function name must not be empty")]
    EmptyName,
}

/// Declared parameter of a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Function metadata (capability descriptor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMeta {
    /// Function name, unique within a registry
    pub name: String,
    /// Function description (for planners)
    #[serde(default)]
    pub description: String,
    /// Declared parameters in declaration order
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl FunctionMeta {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }
}

/// PluginFunction trait - the core abstraction for externally supplied callables
///
/// Functions are black boxes to the interpreter. They may suspend (e.g. on a
/// network call) and return any [`Value`], including opaque host payloads.
#[async_trait]
pub trait PluginFunction: Send + Sync {
    /// Get the function name (unique within its plugin)
    fn name(&self) -> &str;

    /// Get the function description
    fn description(&self) -> &str;

    /// Get function metadata (parameter schema)
    fn metadata(&self) -> FunctionMeta {
        FunctionMeta::new(self.name(), self.description())
    }

    /// Invoke the function
    async fn invoke(
        &self,
        args: FunctionArgs,
        ctx: FunctionContext,
    ) -> Result<Value, InvocationError>;
}

/// A named group of functions
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn functions(&self) -> Vec<Arc<dyn PluginFunction>>;
}

type Handler =
    dyn Fn(FunctionArgs) -> BoxFuture<'static, Result<Value, InvocationError>> + Send + Sync;

/// Closure-backed function
pub struct FnFunction {
    meta: FunctionMeta,
    handler: Box<Handler>,
}

impl FnFunction {
    pub fn new<F, Fut>(meta: FunctionMeta, handler: F) -> Self
    where
        F: Fn(FunctionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvocationError>> + Send + 'static,
    {
        Self {
            meta,
            handler: Box::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl PluginFunction for FnFunction {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> &str {
        &self.meta.description
    }

    fn metadata(&self) -> FunctionMeta {
        self.meta.clone()
    }

    async fn invoke(
        &self,
        args: FunctionArgs,
        _ctx: FunctionContext,
    ) -> Result<Value, InvocationError> {
        (self.handler)(args).await
    }
}

/// A function as stored in the registry, under its registered name
#[derive(Clone)]
pub struct RegisteredFunction {
    pub meta: FunctionMeta,
    pub function: Arc<dyn PluginFunction>,
}

/// Function registry for looking up functions by name
///
/// Populated before execution, then shared read-only (`Arc`) with the
/// executor for the duration of a run.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its own name
    pub fn register(&mut self, function: Arc<dyn PluginFunction>) -> Result<(), RegistryError> {
        let meta = function.metadata();
        self.insert(meta, function)
    }

    /// Register every function of a plugin as `"{plugin}-{function}"`.
    /// Returns the number of functions added.
    pub fn register_plugin(&mut self, plugin: &dyn Plugin) -> Result<usize, RegistryError> {
        let functions = plugin.functions();
        let count = functions.len();
        for function in functions {
            let mut meta = function.metadata();
            meta.name = qualified_name(plugin.name(), &meta.name);
            self.insert(meta, function)?;
        }
        tracing::debug!(plugin = %plugin.name(), functions = count, "plugin registered");
        Ok(count)
    }

    fn insert(
        &mut self,
        meta: FunctionMeta,
        function: Arc<dyn PluginFunction>,
    ) -> Result<(), RegistryError> {
        if meta.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.functions.contains_key(&meta.name) {
            return Err(RegistryError::Duplicate(meta.name));
        }
        self.functions
            .insert(meta.name.clone(), RegisteredFunction { meta, function });
        Ok(())
    }

    /// Get a function by exact name
    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Metadata for every function, sorted by name
    pub fn metas(&self) -> Vec<FunctionMeta> {
        let mut metas: Vec<FunctionMeta> =
            self.functions.values().map(|f| f.meta.clone()).collect();
        metas.sort_by(|a, b| a.name.cmp(&b.name));
        metas
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Name a plugin function is registered under.
pub fn qualified_name(plugin: &str, function: &str) -> String {
    format!("{}-{}", plugin, function)
}
