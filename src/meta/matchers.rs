//! Predicates over metamodel entries, used to discover which attributes
//! can drive a given layout.

use super::{MetaEntry, MetaModel};

pub type Matcher = fn(&str, &MetaEntry) -> bool;

pub fn link_matcher(_key: &str, entry: &MetaEntry) -> bool {
    entry.is_link
}

pub fn hierarchy_matcher(_key: &str, entry: &MetaEntry) -> bool {
    entry.kind.is_categorical() && entry.is_hierarchy
}

pub fn numeric_matcher(_key: &str, entry: &MetaEntry) -> bool {
    entry.kind.is_numeric()
}

/// Matches if any of `matchers` matches.
pub fn or_matcher(matchers: &[Matcher]) -> impl Fn(&str, &MetaEntry) -> bool + '_ {
    move |key, entry| matchers.iter().any(|m| m(key, entry))
}

/// Attributes a tree can be built from.
pub fn link_or_hierarchy_matcher(key: &str, entry: &MetaEntry) -> bool {
    static TREE_MATCHERS: [Matcher; 2] = [link_matcher, hierarchy_matcher];
    or_matcher(&TREE_MATCHERS)(key, entry)
}

/// First key, in metamodel order, satisfying `matcher` (any key when `None`).
pub fn first_metamodel_key<'a>(
    meta: &'a MetaModel,
    matcher: Option<&dyn Fn(&str, &MetaEntry) -> bool>,
) -> Option<&'a str> {
    meta.iter()
        .find(|(key, entry)| matcher.map_or(true, |m| m(key, entry)))
        .map(|(key, _)| key)
}

/// Whether `key` exists in `meta` and satisfies `matcher`.
pub fn key_matches(meta: &MetaModel, key: &str, matcher: Matcher) -> bool {
    meta.get(key).is_some_and(|entry| matcher(key, entry))
}
