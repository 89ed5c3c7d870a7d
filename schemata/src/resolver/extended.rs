//! Ordered composition of resolvers.
//!
//! An [`ExtendedResolver`] holds a list of resolvers that run one after the other as a
//! single resolver. Results are accumulated: object results are shallow merged into the
//! running result, anything else replaces it. An optional [`ResultsPatcher`] gets the
//! last word.
use std::fmt;
use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::ExtendedResolverError;
use crate::error::ResolverResultsPatcherError;
use crate::error::WrappedResolverExecutionError;
use crate::resolver::CallShape;
use crate::resolver::Resolver;
use crate::resolver::ResolverCall;
use crate::resolver::ResolverResult;
use crate::resolver::ResultsPatcher;

#[derive(Clone)]
pub struct ExtendedResolver {
    order: Vec<Resolver>,
    original: Option<Resolver>,
    patcher: Option<ResultsPatcher>,
    /// Installed by a merge rather than built by the resolver's owner.
    merge_layer: bool,
}

impl ExtendedResolver {
    /// Wraps `resolver`, which becomes the original entry.
    ///
    /// Wrapping a resolver that already is an extended resolver copies its entries,
    /// original and patcher. The copy belongs to the caller, even when the source was
    /// installed by a merge.
    pub fn new(resolver: Resolver) -> Self {
        if let Some(extended) = resolver.as_extended() {
            return Self {
                merge_layer: false,
                ..extended.clone()
            };
        }
        Self {
            order: vec![resolver.clone()],
            original: Some(resolver),
            patcher: None,
            merge_layer: false,
        }
    }

    /// Builds an extended resolver around `original` in one go.
    ///
    /// `prepends` run before the original and `appends` after it, each in the order
    /// given.
    pub fn wrap(
        original: Resolver,
        prepends: impl IntoIterator<Item = Resolver>,
        appends: impl IntoIterator<Item = Resolver>,
        patcher: Option<ResultsPatcher>,
    ) -> Self {
        let mut extended = Self::new(original);
        let prepends: Vec<_> = prepends.into_iter().collect();
        let appends: Vec<_> = appends.into_iter().collect();
        for resolver in prepends.into_iter().rev() {
            extended.prepend(resolver);
        }
        for resolver in appends.into_iter().rev() {
            extended.append(resolver);
        }
        if patcher.is_some() {
            extended.patcher = patcher;
        }
        extended
    }

    /// Wraps `original` so that every entry after the injector sees `schema` (and
    /// `root_value`, when given) as the active schema.
    ///
    /// The original's [`CallShape`] decides where the schema is written: `Info`
    /// resolvers read it from `info`, `Context` resolvers from `context`.
    ///
    /// `original` is kept whole, so an extended original keeps its own entries and
    /// patcher. The result is flagged as a merge layer; see [`Resolver::unmerged`].
    pub fn schema_injector(
        original: Resolver,
        schema: Arc<Valid<Schema>>,
        root_value: Option<Value>,
        patcher: Option<ResultsPatcher>,
    ) -> Self {
        let shape = original
            .as_extended()
            .and_then(ExtendedResolver::original)
            .unwrap_or(&original)
            .shape();
        let injector = Resolver::from_fn(move |call| {
            match shape {
                CallShape::Info => {
                    call.info.set_schema(schema.clone());
                    if let Some(root_value) = &root_value {
                        call.info.set_root_value(root_value.clone());
                    }
                }
                CallShape::Context => {
                    call.context.set_schema(schema.clone());
                    if let Some(root_value) = &root_value {
                        call.context.set_root_value(root_value.clone());
                    }
                }
            }
            Ok(call.accumulated.unwrap_or(Value::Null))
        })
        .with_shape(shape)
        .with_label("SchemaInjector");
        let mut extended = Self {
            order: vec![original.clone()],
            original: Some(original),
            patcher,
            merge_layer: true,
        };
        extended.prepend(injector);
        extended
    }

    /// Entries in invocation order.
    pub fn order(&self) -> &[Resolver] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The resolver this one was built around.
    pub fn original(&self) -> Option<&Resolver> {
        self.original.as_ref()
    }

    /// Whether a merge installed this composer.
    pub fn is_merge_layer(&self) -> bool {
        self.merge_layer
    }

    pub fn patcher(&self) -> Option<&ResultsPatcher> {
        self.patcher.as_ref()
    }

    pub fn set_patcher(&mut self, patcher: Option<ResultsPatcher>) -> &mut Self {
        self.patcher = patcher;
        self
    }

    fn original_index(&self) -> Option<usize> {
        let original = self.original.as_ref()?;
        self.order
            .iter()
            .position(|resolver| resolver.ptr_eq(original))
    }

    /// Inserts `resolver` ahead of every entry queued before the original, so the most
    /// recently prepended resolver runs first. Without an original it goes first too.
    pub fn prepend(&mut self, resolver: Resolver) -> &mut Self {
        // only prepended entries ever sit before the original
        self.order.insert(0, resolver);
        self
    }

    /// Inserts `resolver` right after the original, or at the end when the original is
    /// no longer part of the order.
    pub fn append(&mut self, resolver: Resolver) -> &mut Self {
        let index = self
            .original_index()
            .map(|original| original + 1)
            .unwrap_or(self.order.len());
        self.order.insert(index, resolver);
        self
    }

    /// Adds `resolver` at the very end.
    pub fn push(&mut self, resolver: Resolver) -> &mut Self {
        self.order.push(resolver);
        self
    }

    /// Drops `resolver` from the order. The original reference is kept, which leaves
    /// later prepends and appends without an anchor.
    pub fn remove(&mut self, resolver: &Resolver) -> Option<Resolver> {
        let index = self.order.iter().position(|entry| entry.ptr_eq(resolver))?;
        Some(self.order.remove(index))
    }

    /// Runs the composition as a single boxed resolver future.
    pub fn invoke(&self, call: ResolverCall) -> BoxFuture<'static, ResolverResult> {
        let this = self.clone();
        async move { this.run(call).await.map_err(Into::into) }.boxed()
    }

    /// Runs every entry in order, then the patcher.
    pub async fn run(&self, call: ResolverCall) -> Result<Value, ExtendedResolverError> {
        let mut results: Option<Value> = None;
        for (index, resolver) in self.order.iter().enumerate() {
            let mut step = call.clone();
            step.accumulated = results.clone();
            let result = match resolver.invoke(step.clone()).await {
                Ok(result) => result,
                Err(source) => {
                    tracing::debug!(index, len = self.order.len(), "extended resolver entry failed: {source}");
                    return Err(WrappedResolverExecutionError {
                        source,
                        resolver: self.clone(),
                        index,
                        call: step,
                    }
                    .into());
                }
            };
            results = Some(accumulate(results, result));
        }
        let results = results.unwrap_or(Value::Null);
        let Some(patcher) = &self.patcher else {
            return Ok(results);
        };
        match patcher.patch(results.clone()).await {
            Ok(patched) => Ok(patched),
            Err(source) => Err(ResolverResultsPatcherError {
                source,
                patcher: patcher.clone(),
                call,
                results,
            }
            .into()),
        }
    }
}

fn accumulate(results: Option<Value>, result: Value) -> Value {
    match (results, result) {
        (Some(Value::Object(mut results)), Value::Object(result)) => {
            results.extend(result);
            Value::Object(results)
        }
        (_, result) => result,
    }
}

impl From<Resolver> for ExtendedResolver {
    fn from(resolver: Resolver) -> Self {
        Self::new(resolver)
    }
}

impl fmt::Debug for ExtendedResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedResolver")
            .field("order", &self.order)
            .field("original", &self.original_index())
            .field("patched", &self.patcher.is_some())
            .field("merge_layer", &self.merge_layer)
            .finish()
    }
}
