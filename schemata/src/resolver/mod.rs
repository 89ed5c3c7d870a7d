//! Resolver functions, their call arguments and the shared per-call state.
//!
//! A [`Resolver`] is what a resolver map stores at its leaves. It is either a plain
//! async function or an [`ExtendedResolver`], an ordered composition of resolvers that
//! runs as one.
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Map;
use serde_json::Value;

use crate::error::BoxError;
use crate::resolver::extended::ExtendedResolver;

pub mod extended;
pub mod history;
pub mod map;
pub mod walk;

/// Outcome of a single resolver invocation.
pub type ResolverResult = Result<Value, BoxError>;

type ResolverFn = dyn Fn(ResolverCall) -> BoxFuture<'static, ResolverResult> + Send + Sync;

/// Calling convention a resolver was written for.
///
/// `Info` resolvers receive `(parent, args, context, info)` and read the active schema
/// from `info`; `Context` resolvers are root-value style `(args, context, info)` and read
/// it from `context`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallShape {
    #[default]
    Info,
    Context,
}

/// Schema and root value visible to a call. Shared between clones.
#[derive(Clone, Debug, Default)]
struct ScopeSlot {
    schema: Arc<RwLock<Option<Arc<Valid<Schema>>>>>,
    root_value: Arc<RwLock<Option<Value>>>,
}

impl ScopeSlot {
    fn schema(&self) -> Option<Arc<Valid<Schema>>> {
        self.schema.read().clone()
    }

    fn set_schema(&self, schema: Arc<Valid<Schema>>) {
        *self.schema.write() = Some(schema);
    }

    fn root_value(&self) -> Option<Value> {
        self.root_value.read().clone()
    }

    fn set_root_value(&self, value: Value) {
        *self.root_value.write() = Some(value);
    }
}

/// Request scoped data shared by every resolver taking part in a call.
///
/// Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct Context {
    entries: Arc<DashMap<String, Value>>,
    scope: ScopeSlot,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Schema installed for context-shaped resolvers, if any.
    pub fn schema(&self) -> Option<Arc<Valid<Schema>>> {
        self.scope.schema()
    }

    pub fn set_schema(&self, schema: Arc<Valid<Schema>>) {
        self.scope.set_schema(schema)
    }

    pub fn root_value(&self) -> Option<Value> {
        self.scope.root_value()
    }

    pub fn set_root_value(&self, value: Value) {
        self.scope.set_root_value(value)
    }
}

/// Information about the field being resolved.
#[derive(Clone, Debug, Default)]
pub struct ResolveInfo {
    pub parent_type: String,
    pub field_name: String,
    pub path: Vec<String>,
    scope: ScopeSlot,
}

impl ResolveInfo {
    pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            parent_type: parent_type.into(),
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    pub fn schema(&self) -> Option<Arc<Valid<Schema>>> {
        self.scope.schema()
    }

    pub fn set_schema(&self, schema: Arc<Valid<Schema>>) {
        self.scope.set_schema(schema)
    }

    pub fn root_value(&self) -> Option<Value> {
        self.scope.root_value()
    }

    pub fn set_root_value(&self, value: Value) {
        self.scope.set_root_value(value)
    }
}

/// Arguments of one resolver invocation.
///
/// `accumulated` carries the combined results of the entries of an [`ExtendedResolver`]
/// that ran before the current one.
#[derive(Clone, Debug, Default)]
pub struct ResolverCall {
    pub parent: Value,
    pub args: Map<String, Value>,
    pub context: Context,
    pub info: ResolveInfo,
    pub accumulated: Option<Value>,
}

impl ResolverCall {
    pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            info: ResolveInfo::new(parent_type, field_name),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: Value) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

#[derive(Clone)]
enum Inner {
    Function(Arc<ResolverFn>),
    Extended(Arc<ExtendedResolver>),
    Injected(Arc<Injected>),
}

struct Injected {
    injectors: Vec<ResolverInjector>,
    resolver: Resolver,
}

/// A resolver function, cheap to clone.
#[derive(Clone)]
pub struct Resolver {
    inner: Inner,
    shape: CallShape,
    label: Option<Arc<str>>,
}

impl Resolver {
    /// Creates a resolver from an async function.
    pub fn new<F, Fut>(resolver: F) -> Self
    where
        F: Fn(ResolverCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self {
            inner: Inner::Function(Arc::new(move |call| resolver(call).boxed())),
            shape: CallShape::default(),
            label: None,
        }
    }

    /// Creates a resolver from a synchronous function.
    pub fn from_fn<F>(resolver: F) -> Self
    where
        F: Fn(ResolverCall) -> ResolverResult + Send + Sync + 'static,
    {
        Self::new(move |call| futures::future::ready(resolver(call)))
    }

    /// A resolver ignoring its arguments and returning `value`.
    ///
    /// The resolver is labelled with the text of the value, so diagnostics still show
    /// what the leaf originally was.
    pub fn constant(value: Value) -> Self {
        let label = match &value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self::from_fn(move |_| Ok(value.clone())).with_label(label)
    }

    /// Resolves `parent[field_name]`, or null.
    pub fn default_field_resolver() -> Self {
        Self::from_fn(|call| {
            Ok(call
                .parent
                .get(call.info.field_name.as_str())
                .cloned()
                .unwrap_or(Value::Null))
        })
        .with_label("defaultFieldResolver")
    }

    pub fn with_shape(mut self, shape: CallShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Arc::from(label.into()));
        self
    }

    pub fn shape(&self) -> CallShape {
        self.shape
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the composer behind this resolver, if it is one.
    pub fn as_extended(&self) -> Option<&ExtendedResolver> {
        match &self.inner {
            Inner::Extended(extended) => Some(extended),
            Inner::Function(_) | Inner::Injected(_) => None,
        }
    }

    /// The resolver this one was built around.
    ///
    /// Injectors are stripped and extended resolvers yield their original, recursively.
    pub fn base(&self) -> &Resolver {
        match &self.inner {
            Inner::Function(_) => self,
            Inner::Extended(extended) => extended.original().map_or(self, Resolver::base),
            Inner::Injected(injected) => injected.resolver.base(),
        }
    }

    /// This resolver without the layers a merge installs.
    ///
    /// Injector wrappers and schema injecting composers are stripped, recursively.
    /// Composers built by the resolver's owner are returned as they are.
    pub fn unmerged(&self) -> &Resolver {
        match &self.inner {
            Inner::Function(_) => self,
            Inner::Injected(injected) => injected.resolver.unmerged(),
            Inner::Extended(extended) if extended.is_merge_layer() => {
                extended.original().map_or(self, Resolver::unmerged)
            }
            Inner::Extended(_) => self,
        }
    }

    /// Whether both handles point at the same function.
    pub fn ptr_eq(&self, other: &Resolver) -> bool {
        match (&self.inner, &other.inner) {
            (Inner::Function(a), Inner::Function(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Inner::Extended(a), Inner::Extended(b)) => Arc::ptr_eq(a, b),
            (Inner::Injected(a), Inner::Injected(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn invoke(&self, call: ResolverCall) -> BoxFuture<'static, ResolverResult> {
        match &self.inner {
            Inner::Function(function) => function(call),
            Inner::Extended(extended) => extended.invoke(call),
            Inner::Injected(injected) => {
                let call = injected
                    .injectors
                    .iter()
                    .fold(call, |call, injector| injector.inject(call));
                injected.resolver.invoke(call)
            }
        }
    }

    /// Wraps this resolver so that `injectors` rewrite the call arguments, in order,
    /// before it runs.
    pub fn with_injectors(self, injectors: &[ResolverInjector]) -> Self {
        if injectors.is_empty() {
            return self;
        }
        Self {
            shape: self.shape,
            label: self.label.clone(),
            inner: Inner::Injected(Arc::new(Injected {
                injectors: injectors.to_vec(),
                resolver: self,
            })),
        }
    }
}

impl From<ExtendedResolver> for Resolver {
    fn from(extended: ExtendedResolver) -> Self {
        let shape = extended.original().map(Resolver::shape).unwrap_or_default();
        Self {
            inner: Inner::Extended(Arc::new(extended)),
            shape,
            label: None,
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.inner, &self.label) {
            (Inner::Extended(extended), _) => fmt::Debug::fmt(extended, f),
            (Inner::Injected(injected), _) => f
                .debug_struct("Injected")
                .field("injectors", &injected.injectors.len())
                .field("resolver", &injected.resolver)
                .finish(),
            (Inner::Function(_), Some(label)) => write!(f, "Resolver({label})"),
            (Inner::Function(_), None) => f.write_str("Resolver(<fn>)"),
        }
    }
}

/// Post-processing step run once after every entry of an [`ExtendedResolver`].
#[derive(Clone)]
pub struct ResultsPatcher(Arc<dyn Fn(Value) -> BoxFuture<'static, ResolverResult> + Send + Sync>);

impl ResultsPatcher {
    pub fn new<F, Fut>(patcher: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self(Arc::new(move |results| patcher(results).boxed()))
    }

    pub fn from_fn<F>(patcher: F) -> Self
    where
        F: Fn(Value) -> ResolverResult + Send + Sync + 'static,
    {
        Self::new(move |results| futures::future::ready(patcher(results)))
    }

    pub fn patch(&self, results: Value) -> BoxFuture<'static, ResolverResult> {
        (self.0)(results)
    }
}

impl fmt::Debug for ResultsPatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResultsPatcher(<fn>)")
    }
}

/// Rewrites resolver call arguments before a merged resolver runs.
#[derive(Clone)]
pub struct ResolverInjector(Arc<dyn Fn(ResolverCall) -> ResolverCall + Send + Sync>);

impl ResolverInjector {
    pub fn new<F>(injector: F) -> Self
    where
        F: Fn(ResolverCall) -> ResolverCall + Send + Sync + 'static,
    {
        Self(Arc::new(injector))
    }

    pub fn inject(&self, call: ResolverCall) -> ResolverCall {
        (self.0)(call)
    }
}

impl fmt::Debug for ResolverInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolverInjector(<fn>)")
    }
}
