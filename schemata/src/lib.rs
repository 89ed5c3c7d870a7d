//! ## Usage
//!
//! `schemata` combines independently authored GraphQL schema fragments into one schema
//! while keeping every fragment's resolvers working.
//!
//! A [`Schemata`] wraps SDL text (or a parsed document, or a built schema) together with
//! a [`ResolverMap`]. [`Schemata::merge`] merges both the type systems and the
//! resolvers, remembering every contributor so that later merges never lose an
//! ancestor's resolvers. [`Schemata::pare_sdl`] removes the types and fields another
//! fragment defines.
//!
//! Resolvers of a merged schema are [`ExtendedResolver`]s: ordered compositions that
//! run as a single resolver and make the merged schema visible to the original one.
//!
//! Query execution itself is left to a GraphQL execution engine.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod executable;
pub mod merge;
pub mod module;
pub mod resolver;
pub mod scalar;
mod schemata;
pub mod source;

pub use crate::config::MergeConfig;
pub use crate::error::SchemataError;
pub use crate::executable::ExecutableSchema;
pub use crate::merge::ConflictResolvers;
pub use crate::merge::FieldNode;
pub use crate::merge::MergeOptions;
pub use crate::module::GraphQLModule;
pub use crate::resolver::CallShape;
pub use crate::resolver::Context;
pub use crate::resolver::ResolveInfo;
pub use crate::resolver::Resolver;
pub use crate::resolver::ResolverCall;
pub use crate::resolver::ResolverInjector;
pub use crate::resolver::ResultsPatcher;
pub use crate::resolver::extended::ExtendedResolver;
pub use crate::resolver::history::ExtendedResolverMap;
pub use crate::resolver::map::ResolverEntry;
pub use crate::resolver::map::ResolverMap;
pub use crate::scalar::ScalarConfig;
pub use crate::schemata::Schemata;
pub use crate::source::SchemaSource;

const _: () = {
    const fn assert_thread_safe<T: Sync + Send>() {}

    assert_thread_safe::<Schemata>();
    assert_thread_safe::<ExecutableSchema>();
    assert_thread_safe::<Resolver>();
    assert_thread_safe::<ExtendedResolver>();
    assert_thread_safe::<ResolverMap>();
    assert_thread_safe::<MergeOptions>();
    assert_thread_safe::<SchemataError>();
};
