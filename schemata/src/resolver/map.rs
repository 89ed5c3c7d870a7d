use std::fmt;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::Value;

use crate::error::InvalidPathError;
use crate::resolver::Resolver;

/// A leaf or branch of a [`ResolverMap`].
#[derive(Clone, Debug)]
pub enum ResolverEntry {
    Resolver(Resolver),
    Map(ResolverMap),
    /// A leaf that is neither a resolver nor a branch. Walking a map holding one fails
    /// unless non-function leaves are wrapped.
    Value(Value),
}

impl ResolverEntry {
    pub fn as_resolver(&self) -> Option<&Resolver> {
        match self {
            ResolverEntry::Resolver(resolver) => Some(resolver),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ResolverMap> {
        match self {
            ResolverEntry::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<Resolver> for ResolverEntry {
    fn from(resolver: Resolver) -> Self {
        ResolverEntry::Resolver(resolver)
    }
}

impl From<ResolverMap> for ResolverEntry {
    fn from(map: ResolverMap) -> Self {
        ResolverEntry::Map(map)
    }
}

impl From<Value> for ResolverEntry {
    fn from(value: Value) -> Self {
        ResolverEntry::Value(value)
    }
}

/// Resolvers keyed by type name and field name.
///
/// Root operation fields may also be stored flat, keyed by field name alone.
#[derive(Clone, Default)]
pub struct ResolverMap(IndexMap<String, ResolverEntry>);

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entry` under `key`, builder style.
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<ResolverEntry>) -> Self {
        self.insert(key, entry);
        self
    }

    /// Adds a branch for `type_name` holding the given field resolvers.
    pub fn with_type<K: Into<String>>(
        mut self,
        type_name: impl Into<String>,
        fields: impl IntoIterator<Item = (K, Resolver)>,
    ) -> Self {
        let branch = fields
            .into_iter()
            .fold(ResolverMap::new(), |map, (field, resolver)| {
                map.with(field, resolver)
            });
        match self.0.entry(type_name.into()) {
            Entry::Occupied(mut existing) => match existing.get_mut() {
                ResolverEntry::Map(map) => map.deep_merge(&branch),
                other => *other = ResolverEntry::Map(branch),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(ResolverEntry::Map(branch));
            }
        }
        self
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        entry: impl Into<ResolverEntry>,
    ) -> Option<ResolverEntry> {
        self.0.insert(key.into(), entry.into())
    }

    pub fn get(&self, key: &str) -> Option<&ResolverEntry> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ResolverEntry> {
        self.0.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ResolverEntry> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ResolverEntry> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The resolver bound to `type_name.field_name`, if any.
    pub fn resolver(&self, type_name: &str, field_name: &str) -> Option<&Resolver> {
        self.at_nicely(&[type_name, field_name])
            .and_then(ResolverEntry::as_resolver)
    }

    /// Number of resolver leaves in the whole tree.
    pub fn resolver_count(&self) -> usize {
        self.0
            .values()
            .map(|entry| match entry {
                ResolverEntry::Resolver(_) => 1,
                ResolverEntry::Map(map) => map.resolver_count(),
                ResolverEntry::Value(_) => 0,
            })
            .sum()
    }

    /// The entry at `path`.
    ///
    /// Every segment but the last must name a branch.
    pub fn at<S: AsRef<str>>(&self, path: &[S]) -> Result<&ResolverEntry, InvalidPathError> {
        let invalid = |segment: &S| InvalidPathError {
            path: path.iter().map(|s| s.as_ref().to_string()).collect(),
            segment: segment.as_ref().to_string(),
        };
        let Some((last, branches)) = path.split_last() else {
            return Err(InvalidPathError {
                path: Vec::new(),
                segment: String::new(),
            });
        };
        let mut current = self;
        for segment in branches {
            current = match current.get(segment.as_ref()) {
                Some(ResolverEntry::Map(map)) => map,
                _ => return Err(invalid(segment)),
            };
        }
        current.get(last.as_ref()).ok_or_else(|| invalid(last))
    }

    /// Like [`ResolverMap::at`], returning `None` instead of failing.
    pub fn at_nicely<S: AsRef<str>>(&self, path: &[S]) -> Option<&ResolverEntry> {
        self.at(path).ok()
    }

    /// The branch at `path`, created (replacing any leaf in the way) when missing.
    fn branch_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut ResolverMap> {
        let mut current = self;
        for segment in path {
            let entry = current
                .0
                .entry(segment.as_ref().to_string())
                .or_insert_with(|| ResolverEntry::Map(ResolverMap::new()));
            if !matches!(entry, ResolverEntry::Map(_)) {
                *entry = ResolverEntry::Map(ResolverMap::new());
            }
            let ResolverEntry::Map(branch) = entry else {
                return None;
            };
            current = branch;
        }
        Some(current)
    }

    /// Writes `entry` under `key` in the branch at `path`, creating missing branches.
    pub fn set_at<S: AsRef<str>>(
        &mut self,
        path: &[S],
        key: impl Into<String>,
        entry: impl Into<ResolverEntry>,
    ) -> Option<ResolverEntry> {
        self.branch_mut(path)?.insert(key, entry)
    }

    /// Removes the entry at `path`, pruning branches left empty.
    pub fn remove_at<S: AsRef<str>>(&mut self, path: &[S]) -> Option<ResolverEntry> {
        match path {
            [] => None,
            [key] => self.remove(key.as_ref()),
            [head, rest @ ..] => {
                let ResolverEntry::Map(branch) = self.0.get_mut(head.as_ref())? else {
                    return None;
                };
                let removed = branch.remove_at(rest);
                if branch.is_empty() {
                    self.remove(head.as_ref());
                }
                removed
            }
        }
    }

    /// Folds `other` into this map. Branches are merged recursively, any other collision
    /// is won by `other`.
    pub fn deep_merge(&mut self, other: &ResolverMap) {
        for (key, entry) in other.iter() {
            match (self.0.get_mut(key), entry) {
                (Some(ResolverEntry::Map(mine)), ResolverEntry::Map(theirs)) => {
                    mine.deep_merge(theirs)
                }
                _ => {
                    self.0.insert(key.clone(), entry.clone());
                }
            }
        }
    }
}

impl fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl FromIterator<(String, ResolverEntry)> for ResolverMap {
    fn from_iter<T: IntoIterator<Item = (String, ResolverEntry)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ResolverMap {
    type Item = (String, ResolverEntry);
    type IntoIter = indexmap::map::IntoIter<String, ResolverEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResolverMap {
    type Item = (&'a String, &'a ResolverEntry);
    type IntoIter = indexmap::map::Iter<'a, String, ResolverEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
