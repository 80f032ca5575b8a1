//! Role binding types
//!
//! Wire representations for namespace-scoped RBAC role bindings and for the
//! namespace-grouped deletion payload.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// RoleBinding information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub resource_version: Option<String>,
    pub role_ref: RoleRef,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<String>,
    /// Set for bindings managed by the cluster itself
    #[serde(default)]
    pub is_system: bool,
}

/// Role reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

/// Subject (user, group, or service account)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub api_group: Option<String>,
}

/// Identity of a single role binding inside a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingRef<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
}

impl fmt::Display for BindingRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Role bindings to delete, grouped by namespace.
///
/// On the wire this is a JSON object mapping a namespace to the names to
/// delete in it. Groups keep the order the caller wrote them in, and
/// [`DeleteRequestBatch::targets`] flattens them into the exact sequence
/// deletions are attempted in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRequestBatch {
    groups: Vec<(String, Vec<String>)>,
}

impl DeleteRequestBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a namespace group. Names for a namespace that is already
    /// present are added to the existing group.
    pub fn push<N, I, S>(&mut self, namespace: N, names: I)
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespace = namespace.into();
        let names = names.into_iter().map(Into::into);

        match self.groups.iter_mut().find(|(ns, _)| *ns == namespace) {
            Some((_, existing)) => existing.extend(names),
            None => self.groups.push((namespace, names.collect())),
        }
    }

    pub fn with<N, I, S>(mut self, namespace: N, names: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(namespace, names);
        self
    }

    /// Namespace groups in payload order
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(namespace, names)| (namespace.as_str(), names.as_slice()))
    }

    /// Every (namespace, name) pair in the order deletions are issued
    pub fn targets(&self) -> Vec<BindingRef<'_>> {
        self.groups
            .iter()
            .flat_map(|(namespace, names)| {
                names.iter().map(move |name| BindingRef {
                    namespace: namespace.as_str(),
                    name: name.as_str(),
                })
            })
            .collect()
    }

    /// Number of namespace groups
    pub fn namespace_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of deletion targets across all namespaces
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, names)| names.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for DeleteRequestBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (namespace, names) in &self.groups {
            map.serialize_entry(namespace, names)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DeleteRequestBatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BatchVisitor;

        impl<'de> Visitor<'de> for BatchVisitor {
            type Value = DeleteRequestBatch;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of namespace to a list of role binding names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut groups: Vec<(String, Vec<String>)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));

                while let Some((namespace, names)) = map.next_entry::<String, Vec<String>>()? {
                    if groups.iter().any(|(ns, _)| *ns == namespace) {
                        return Err(de::Error::custom(format_args!(
                            "duplicate namespace `{}`",
                            namespace
                        )));
                    }
                    groups.push((namespace, names));
                }

                Ok(DeleteRequestBatch { groups })
            }
        }

        deserializer.deserialize_map(BatchVisitor)
    }
}
