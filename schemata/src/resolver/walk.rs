//! Depth-first traversal of resolver maps.
//!
//! The walkers rebuild a map leaf by leaf: branches are descended into, resolver leaves
//! are handed to a visitor whose answer replaces (or drops) the leaf, and any other leaf
//! is either wrapped into a constant resolver or reported as a stumble.
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::ResolverMapStumbleError;
use crate::resolver::Resolver;
use crate::resolver::map::ResolverEntry;
use crate::resolver::map::ResolverMap;

/// Identity visitor.
pub fn keep_resolver(
    _key: &str,
    resolver: &Resolver,
    _path: &[String],
    _map: &ResolverMap,
) -> Option<Resolver> {
    Some(resolver.clone())
}

fn stumble(
    key: &str,
    value: &ResolverEntry,
    path: &[String],
    source_map: &ResolverMap,
    destination_map: &ResolverMap,
) -> ResolverMapStumbleError {
    ResolverMapStumbleError {
        key: key.to_string(),
        value: match value {
            ResolverEntry::Value(value) => value.to_string(),
            other => format!("{other:?}"),
        },
        path: path.to_vec(),
        message: "leaf is neither a resolver nor a nested map".to_string(),
        source_map: source_map.clone(),
        destination_map: destination_map.clone(),
        cause: None,
    }
}

/// Walks `map` synchronously, starting at `path`.
///
/// The visitor receives `(key, resolver, path, root)` where `root` is the map given to
/// the walk; returning `None` drops the leaf.
/// A leaf that is neither a resolver nor a branch fails the walk unless
/// `wrap_non_function_leaves` is set, in which case it becomes [`Resolver::constant`].
pub fn walk_resolver_map<V>(
    map: &ResolverMap,
    mut visitor: V,
    wrap_non_function_leaves: bool,
    path: &[String],
) -> Result<ResolverMap, ResolverMapStumbleError>
where
    V: FnMut(&str, &Resolver, &[String], &ResolverMap) -> Option<Resolver>,
{
    let mut output = ResolverMap::new();
    walk_into(
        map,
        map,
        &mut visitor,
        wrap_non_function_leaves,
        path,
        path.len(),
        &mut output,
    )?;
    Ok(output)
}

fn walk_into<V>(
    root: &ResolverMap,
    map: &ResolverMap,
    visitor: &mut V,
    wrap_non_function_leaves: bool,
    path: &[String],
    root_depth: usize,
    output: &mut ResolverMap,
) -> Result<(), ResolverMapStumbleError>
where
    V: FnMut(&str, &Resolver, &[String], &ResolverMap) -> Option<Resolver>,
{
    for (key, entry) in map {
        let resolver = match entry {
            ResolverEntry::Map(branch) => {
                let mut branch_path = path.to_vec();
                branch_path.push(key.clone());
                walk_into(
                    root,
                    branch,
                    visitor,
                    wrap_non_function_leaves,
                    &branch_path,
                    root_depth,
                    output,
                )?;
                continue;
            }
            ResolverEntry::Value(value) if wrap_non_function_leaves => {
                Resolver::constant(value.clone())
            }
            ResolverEntry::Value(_) => {
                return Err(stumble(key, entry, path, map, output));
            }
            ResolverEntry::Resolver(resolver) => resolver.clone(),
        };
        if let Some(visited) = visitor(key, &resolver, path, root) {
            output.set_at(&path[root_depth..], key.clone(), visited);
        }
    }
    Ok(())
}

/// Asynchronous counterpart of [`walk_resolver_map`].
///
/// The visitor receives the same `(key, resolver, path, root)` arguments; the returned
/// future may not borrow them, so read what it needs from `root` before building it.
///
/// A branch whose walk fails does not abort the walk: the failure is wrapped with the
/// branch context, pushed onto `skips` when a collector is given, and the branch is
/// left out of the result. A stumble on a leaf of the top level map still fails.
pub async fn walk_resolver_map_async<V, Fut>(
    map: &ResolverMap,
    mut visitor: V,
    wrap_non_function_leaves: bool,
    path: &[String],
    skips: Option<&mut Vec<ResolverMapStumbleError>>,
) -> Result<ResolverMap, ResolverMapStumbleError>
where
    V: FnMut(String, Resolver, Vec<String>, &ResolverMap) -> Fut + Send,
    Fut: Future<Output = Option<Resolver>> + Send,
{
    let mut skipped = Vec::new();
    let walked = walk_async_inner(
        map,
        map,
        &mut visitor,
        wrap_non_function_leaves,
        path.to_vec(),
        &mut skipped,
    )
    .await;
    if let Some(skips) = skips {
        skips.extend(skipped);
    }
    walked
}

fn walk_async_inner<'a, V, Fut>(
    root: &'a ResolverMap,
    map: &'a ResolverMap,
    visitor: &'a mut V,
    wrap_non_function_leaves: bool,
    path: Vec<String>,
    skips: &'a mut Vec<ResolverMapStumbleError>,
) -> BoxFuture<'a, Result<ResolverMap, ResolverMapStumbleError>>
where
    V: FnMut(String, Resolver, Vec<String>, &ResolverMap) -> Fut + Send,
    Fut: Future<Output = Option<Resolver>> + Send + 'a,
{
    async move {
        let mut output = ResolverMap::new();
        for (key, entry) in map {
            let resolver = match entry {
                ResolverEntry::Map(branch) => {
                    let mut branch_path = path.clone();
                    branch_path.push(key.clone());
                    match walk_async_inner(
                        root,
                        branch,
                        &mut *visitor,
                        wrap_non_function_leaves,
                        branch_path,
                        &mut *skips,
                    )
                    .await
                    {
                        Ok(walked) => {
                            if !walked.is_empty() {
                                output.insert(key.clone(), walked);
                            }
                        }
                        Err(error) => {
                            let skip = ResolverMapStumbleError {
                                key: key.clone(),
                                value: format!("{branch:?}"),
                                path: path.clone(),
                                message: format!("skipped branch `{key}`"),
                                source_map: map.clone(),
                                destination_map: output.clone(),
                                cause: Some(Box::new(error)),
                            };
                            tracing::warn!(key = %key, path = ?path, "skipping resolver map branch: {skip}");
                            skips.push(skip);
                        }
                    }
                    continue;
                }
                ResolverEntry::Value(value) if wrap_non_function_leaves => {
                    Resolver::constant(value.clone())
                }
                ResolverEntry::Value(_) => {
                    return Err(stumble(key, entry, &path, map, &output));
                }
                ResolverEntry::Resolver(resolver) => resolver.clone(),
            };
            if let Some(visited) = visitor(key.clone(), resolver, path.clone(), root).await {
                output.insert(key.clone(), visited);
            }
        }
        Ok(output)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use serde_json::json;

    use super::*;
    use crate::resolver::ResolverCall;

    fn noop() -> Resolver {
        Resolver::from_fn(|_| Ok(Value::Null))
    }

    fn malformed() -> ResolverMap {
        ResolverMap::new().with(
            "Query",
            ResolverMap::new().with("peep", json!("not a function")),
        )
    }

    #[test]
    fn stumbles_on_non_function_leaf() {
        let error = walk_resolver_map(&malformed(), keep_resolver, false, &[]).unwrap_err();
        assert_eq!(error.key, "peep");
        assert_eq!(error.path, vec!["Query".to_string()]);
        assert_eq!(error.value, "\"not a function\"");
    }

    #[tokio::test]
    async fn wraps_non_function_leaf() {
        let walked = walk_resolver_map(&malformed(), keep_resolver, true, &[]).unwrap();
        let peep = walked.resolver("Query", "peep").unwrap();
        assert_eq!(peep.label(), Some("not a function"));
        let value = peep.invoke(ResolverCall::default()).await.unwrap();
        assert_eq!(value, json!("not a function"));
    }

    #[test]
    fn visitor_can_drop_leaves() {
        let map = ResolverMap::new()
            .with_type("Query", [("peep", noop()), ("poke", noop())])
            .with("flat", noop());
        let mut seen = Vec::new();
        let walked = walk_resolver_map(
            &map,
            |key, resolver, path, _| {
                seen.push(format!("{}/{key}", path.join(".")));
                (key != "poke").then(|| resolver.clone())
            },
            false,
            &[],
        )
        .unwrap();
        assert_eq!(seen, vec!["Query/peep", "Query/poke", "/flat"]);
        assert!(walked.resolver("Query", "peep").is_some());
        assert!(walked.at_nicely(&["Query", "poke"]).is_none());
        assert!(walked.get("flat").is_some());
    }

    #[test]
    fn path_prefix_is_reported_but_not_written() {
        let map = ResolverMap::new().with("peep", noop());
        let mut paths = Vec::new();
        let walked = walk_resolver_map(
            &map,
            |_, resolver, path, _| {
                paths.push(path.to_vec());
                Some(resolver.clone())
            },
            false,
            &["Query".to_string()],
        )
        .unwrap();
        assert_eq!(paths, vec![vec!["Query".to_string()]]);
        assert!(walked.get("peep").is_some());
    }

    #[tokio::test]
    async fn async_walk_records_skips() {
        let map = malformed().with_type("Person", [("name", noop())]);
        let mut skips = Vec::new();
        let walked = walk_resolver_map_async(
            &map,
            |_, resolver, _, _| async move { Some(resolver) },
            false,
            &[],
            Some(&mut skips),
        )
        .await
        .unwrap();
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].key, "Query");
        assert_eq!(skips[0].cause.as_ref().unwrap().key, "peep");
        assert!(walked.get("Query").is_none());
        assert!(walked.resolver("Person", "name").is_some());
    }

    #[tokio::test]
    async fn async_visitor_sees_the_walked_map() {
        let map = ResolverMap::new()
            .with_type("Query", [("peep", noop())])
            .with_type("Person", [("name", noop())]);
        let walked = walk_resolver_map_async(
            &map,
            |key, resolver, path, root| {
                let root_len = root.len();
                let in_root = root.resolver(&path[0], &key).is_some();
                async move { (root_len == 2 && in_root).then_some(resolver) }
            },
            false,
            &[],
            None,
        )
        .await
        .unwrap();
        assert!(walked.resolver("Query", "peep").is_some());
        assert!(walked.resolver("Person", "name").is_some());
    }

    #[tokio::test]
    async fn async_walk_fails_on_top_level_stumble() {
        let map = ResolverMap::new().with("peep", json!(42));
        let result = walk_resolver_map_async(
            &map,
            |_, resolver, _, _| async move { Some(resolver) },
            false,
            &[],
            None,
        )
        .await;
        assert!(result.is_err());
    }
}
