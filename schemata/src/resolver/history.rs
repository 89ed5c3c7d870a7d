use std::sync::Arc;

use crate::executable::ExecutableSchema;
use crate::resolver::map::ResolverMap;
use crate::resolver::walk::walk_resolver_map;
use crate::schemata::Schemata;

/// Snapshot of one contributor to a merge.
///
/// Resolvers are stored without the layers earlier merges installed (see
/// [`Resolver::unmerged`]), so merge-time wrapping never piles up across merges while
/// composers built by the owner survive.
///
/// [`Resolver::unmerged`]: crate::resolver::Resolver::unmerged
#[derive(Clone, Debug, Default)]
pub struct ExtendedResolverMap {
    pub schema: Option<Arc<ExecutableSchema>>,
    pub sdl: Option<String>,
    pub resolvers: ResolverMap,
}

impl ExtendedResolverMap {
    /// Captures `schemata` as it is right now.
    pub fn capture(schemata: &Schemata) -> Self {
        let resolvers = schemata
            .resolvers()
            .map(|resolvers| unwrap_resolvers(&resolvers))
            .unwrap_or_default();
        Self {
            schema: schemata.cached_schema(),
            sdl: (!schemata.sdl().is_empty()).then(|| schemata.sdl().to_string()),
            resolvers,
        }
    }

    /// Folds the resolvers of every snapshot in `history`, later snapshots winning.
    pub fn fold(history: &[ExtendedResolverMap]) -> ResolverMap {
        history
            .iter()
            .fold(ResolverMap::new(), |mut resolvers, snapshot| {
                resolvers.deep_merge(&snapshot.resolvers);
                resolvers
            })
    }
}

fn unwrap_resolvers(resolvers: &ResolverMap) -> ResolverMap {
    let unwrapped = walk_resolver_map(
        resolvers,
        |_, resolver, _, _| Some(resolver.unmerged().clone()),
        true,
        &[],
    );
    // wrapping non-function leaves makes the walk infallible
    unwrapped.unwrap_or_else(|_| resolvers.clone())
}
