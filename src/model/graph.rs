use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One resolved package occurrence in a project's dependency tree.
///
/// The package name is not stored on the node; it is the key under which
/// the node appears in its parent's [`DependencyMap`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    #[serde(
        default,
        deserialize_with = "lenient_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMap>,
}

impl DependencyNode {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            dependencies: None,
        }
    }

    /// Adds a nested dependency, keeping insertion order.
    pub fn with_dependency(mut self, name: impl Into<String>, node: DependencyNode) -> Self {
        self.dependencies
            .get_or_insert_with(DependencyMap::default)
            .insert(name, node);
        self
    }
}

/// Reads `version` as a string; `null`, numbers, objects and the empty
/// string all mean "no usable version".
fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawVersion {
        Text(String),
        #[allow(dead_code)]
        Other(IgnoredAny),
    }

    Ok(match RawVersion::deserialize(deserializer)? {
        RawVersion::Text(version) if !version.is_empty() => Some(version),
        _ => None,
    })
}

/// Package name to node mapping that keeps the order of the source document.
///
/// `npm ls --json` emits dependencies in a stable order and reports are
/// expected to follow it, so a hash map alone is not an option here. The
/// side index only serves lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyMap {
    entries: Vec<(String, DependencyNode)>,
    index: HashMap<String, usize>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node. A repeated key replaces the earlier node in place,
    /// which mirrors how a JSON object with duplicate keys is read.
    pub fn insert(&mut self, name: impl Into<String>, node: DependencyNode) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&position) => self.entries[position].1 = node,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, node));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DependencyNode> {
        self.index.get(name).map(|&position| &self.entries[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DependencyNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, DependencyNode)> for DependencyMap {
    fn from_iter<I: IntoIterator<Item = (N, DependencyNode)>>(iter: I) -> Self {
        let mut map = DependencyMap::new();
        for (name, node) in iter {
            map.insert(name, node);
        }
        map
    }
}

impl Serialize for DependencyMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(name, node)| (name, node)))
    }
}

impl<'de> Deserialize<'de> for DependencyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // npm writes `null` or scalars for entries it could not resolve;
        // those are dropped rather than failing the whole document.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawEntry {
            Node(DependencyNode),
            #[allow(dead_code)]
            Unresolved(IgnoredAny),
        }

        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = DependencyMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of package names to dependency nodes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = DependencyMap::new();
                while let Some((name, entry)) = access.next_entry::<String, RawEntry>()? {
                    if let RawEntry::Node(node) = entry {
                        map.insert(name, node);
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// The resolved dependency tree of one project, as reported by `npm ls --json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_dependencies: Option<DependencyMap>,
}
