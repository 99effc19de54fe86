//! Live configuration collection
//!
//! The collection is the per-request snapshot of every configuration item on
//! the site, keyed by full name, together with the component type registry.
//! It resolves full names to (type, short name) pairs by longest-prefix match
//! and answers the dependency questions the reconciler asks: the transitive
//! dependency closure of a set of items, and which members of a set are
//! reachable from another member (auto-detectable).

use crate::item::{ConfigItem, ConfigType, DEPENDENCIES_COMPONENT, SIMPLE_TYPE};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// The live configuration collection plus the component type registry.
#[derive(Debug, Clone, Default)]
pub struct ConfigCollection {
    types: IndexMap<String, ConfigType>,
    items: IndexMap<String, ConfigItem>,
}

impl ConfigCollection {
    /// Build a collection from a type registry and raw item data.
    ///
    /// Item type and short name are derived here from the name prefix; the
    /// simple type catches anything without a declared prefix.
    pub fn new(types: Vec<ConfigType>) -> Self {
        let mut registry: IndexMap<String, ConfigType> = IndexMap::new();
        for ty in types {
            registry.insert(ty.id.clone(), ty);
        }
        registry
            .entry(SIMPLE_TYPE.to_string())
            .or_insert_with(ConfigType::simple);
        Self {
            types: registry,
            items: IndexMap::new(),
        }
    }

    /// Insert an item, deriving its type and short name from its full name.
    pub fn insert(
        &mut self,
        name: String,
        label: String,
        package: Option<String>,
        provider: Option<String>,
        dependencies: Vec<String>,
    ) {
        let (type_id, short_name) = self.parse_name(&name);
        let item = ConfigItem {
            name: name.clone(),
            type_id,
            short_name,
            label,
            package,
            provider,
            dependencies,
        };
        self.items.insert(name, item);
    }

    pub fn get(&self, name: &str) -> Option<&ConfigItem> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn items(&self) -> impl Iterator<Item = &ConfigItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The component type registry, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &ConfigType> {
        self.types.values()
    }

    pub fn type_label<'a>(&'a self, type_id: &'a str) -> &'a str {
        if type_id == DEPENDENCIES_COMPONENT {
            return "Dependencies";
        }
        self.types
            .get(type_id)
            .map(|ty| ty.label.as_str())
            .unwrap_or(type_id)
    }

    /// Compose a full config name from a component type and short name.
    ///
    /// The dependencies pseudo-component and the simple type pass the short
    /// name through unchanged.
    pub fn full_name(&self, type_id: &str, short_name: &str) -> String {
        if type_id == DEPENDENCIES_COMPONENT {
            return short_name.to_string();
        }
        match self.types.get(type_id).and_then(|ty| ty.prefix.as_deref()) {
            Some(prefix) => format!("{}.{}", prefix, short_name),
            None => short_name.to_string(),
        }
    }

    /// Split a full config name into (type id, short name) by longest-prefix match.
    pub fn parse_name(&self, name: &str) -> (String, String) {
        let mut best: Option<(&ConfigType, usize)> = None;
        for ty in self.types.values() {
            if let Some(prefix) = ty.prefix.as_deref() {
                if let Some(rest) = name.strip_prefix(prefix) {
                    if let Some(short) = rest.strip_prefix('.') {
                        if !short.is_empty() && best.map(|(_, len)| prefix.len() > len).unwrap_or(true)
                        {
                            best = Some((ty, prefix.len()));
                        }
                    }
                }
            }
        }
        match best {
            Some((ty, len)) => (ty.id.clone(), name[len + 1..].to_string()),
            None => (SIMPLE_TYPE.to_string(), name.to_string()),
        }
    }

    /// Expand a set of config names with their transitive dependencies.
    ///
    /// Only live items are returned; dangling dependency edges are skipped.
    /// Seed names absent from the collection contribute nothing.
    pub fn expand_with_dependencies<'a, I>(&self, seeds: I) -> IndexSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut result: IndexSet<String> = IndexSet::new();
        let mut ordered: Vec<String> = Vec::new();
        for seed in seeds {
            if self.items.contains_key(seed) && result.insert(seed.to_string()) {
                ordered.push(seed.to_string());
            }
        }
        let mut cursor = 0;
        while cursor < ordered.len() {
            let name = ordered[cursor].clone();
            cursor += 1;
            if let Some(item) = self.items.get(&name) {
                for dep in &item.dependencies {
                    if self.items.contains_key(dep) && result.insert(dep.clone()) {
                        ordered.push(dep.clone());
                    }
                }
            }
        }
        debug!(
            expanded = result.len(),
            "expanded config set with dependencies"
        );
        result
    }

    /// Names in `members` that some *other* member reaches through dependency
    /// edges. These are the auto-detectable items: deselecting one returns it
    /// to the detected section because dependency detection would pull it back.
    pub fn detectable_within(&self, members: &IndexSet<String>) -> HashSet<String> {
        let mut detectable = HashSet::new();
        for origin in members {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut queue: VecDeque<&str> = VecDeque::new();
            if let Some(item) = self.items.get(origin) {
                for dep in &item.dependencies {
                    queue.push_back(dep);
                }
            }
            while let Some(name) = queue.pop_front() {
                if !seen.insert(name) {
                    continue;
                }
                if name != origin && members.contains(name) {
                    detectable.insert(name.to_string());
                }
                if let Some(item) = self.items.get(name) {
                    for dep in &item.dependencies {
                        queue.push_back(dep);
                    }
                }
            }
        }
        detectable
    }
}
