//! The desired configuration: what the groups should look like.
//!
//! The document has the shape
//!
//! ```json
//! { "groups": { "admins": { "name": "admins", "full_name": "Admins" } } }
//! ```
//!
//! where `admins` is the local identifier. It is never sent to the remote
//! system; only the attributes are.

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApplierError, Result};

/// A list of usernames, either as a JSON array or as one comma-joined string.
///
/// Discourse accepts the joined form; configuration generators tend to emit
/// arrays. Whichever form was written is sent back out unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberList {
    List(Vec<String>),
    Joined(String),
}

impl MemberList {
    pub fn usernames(&self) -> Vec<String> {
        match self {
            Self::List(names) => names.clone(),
            Self::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Attributes of a group as the remote API expects them.
///
/// The well-known fields are typed; everything else lands in `extra` and is
/// passed through verbatim. For a typed field, `None` means the key was not
/// written and `Some(None)` is an explicit `null`, which is sent to the remote
/// to clear the value there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAttributes {
    /// Remote-visible name. May change between runs.
    pub name: String,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub full_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub bio_raw: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub usernames: Option<Option<MemberList>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_usernames: Option<Option<MemberList>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub visibility_level: Option<Option<u8>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub primary_group: Option<Option<bool>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub flair_icon: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub automatic_membership_email_domains: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GroupAttributes {
    /// Attributes with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            bio_raw: None,
            usernames: None,
            owner_usernames: None,
            visibility_level: None,
            primary_group: None,
            title: None,
            flair_icon: None,
            automatic_membership_email_domains: None,
            extra: Map::new(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(Some(full_name.into()));
        self
    }

    /// Usernames of the members listed in the configuration, if any.
    pub fn member_usernames(&self) -> Vec<String> {
        self.usernames
            .as_ref()
            .and_then(Option::as_ref)
            .map(MemberList::usernames)
            .unwrap_or_default()
    }

    /// The payload sent to the remote.
    pub fn to_payload(&self) -> Value {
        // Serializing a struct of strings, numbers and JSON values cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Keeps an explicit `null` apart from a missing key.
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One group of the desired configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredEntity {
    /// Stable key chosen by the configuration author.
    pub local_id: String,
    pub attributes: GroupAttributes,
}

impl DesiredEntity {
    pub fn new(local_id: impl Into<String>, attributes: GroupAttributes) -> Self {
        Self {
            local_id: local_id.into(),
            attributes,
        }
    }

    /// The remote-visible name.
    pub fn name(&self) -> &str {
        &self.attributes.name
    }
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(deserialize_with = "unique_groups")]
    groups: IndexMap<String, GroupAttributes>,
}

/// Rejects a local identifier that appears twice. serde_json keeps the last
/// duplicate of a map key without complaint.
fn unique_groups<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, GroupAttributes>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueGroups;

    impl<'de> Visitor<'de> for UniqueGroups {
        type Value = IndexMap<String, GroupAttributes>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of local identifiers to group attributes")
        }

        fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut groups = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((local_id, attributes)) =
                access.next_entry::<String, GroupAttributes>()?
            {
                if groups.contains_key(&local_id) {
                    return Err(de::Error::custom(format!(
                        "duplicate local identifier `{local_id}`"
                    )));
                }
                groups.insert(local_id, attributes);
            }
            Ok(groups)
        }
    }

    deserializer.deserialize_map(UniqueGroups)
}

/// The full desired configuration, in document order.
#[derive(Debug, Clone)]
pub struct DesiredConfig {
    groups: Vec<DesiredEntity>,
    raw: Value,
}

impl DesiredConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ApplierError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(content: &str) -> Result<Self> {
        let document: ConfigDocument = serde_json::from_str(content)
            .map_err(|e| ApplierError::configuration(format!("cannot parse configuration: {e}")))?;
        let raw: Value = serde_json::from_str(content)
            .map_err(|e| ApplierError::configuration(format!("cannot parse configuration: {e}")))?;

        let groups = document
            .groups
            .into_iter()
            .map(|(local_id, attributes)| DesiredEntity::new(local_id, attributes))
            .collect();
        let config = Self { groups, raw };
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from entities, e.g. in tests.
    pub fn from_entities(groups: Vec<DesiredEntity>) -> Result<Self> {
        let mut snapshot = Map::new();
        for entity in &groups {
            if snapshot
                .insert(entity.local_id.clone(), entity.attributes.to_payload())
                .is_some()
            {
                return Err(ApplierError::configuration(format!(
                    "duplicate local identifier `{}`",
                    entity.local_id
                )));
            }
        }
        let mut raw = Map::new();
        raw.insert("groups".into(), Value::Object(snapshot));
        let config = Self {
            groups,
            raw: Value::Object(raw),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for entity in &self.groups {
            if entity.local_id.trim().is_empty() {
                return Err(ApplierError::configuration(
                    "group local identifiers must not be empty",
                ));
            }
            if entity.name().trim().is_empty() {
                return Err(ApplierError::configuration(format!(
                    "group `{}` has an empty name",
                    entity.local_id
                )));
            }
        }
        Ok(())
    }

    pub fn groups(&self) -> &[DesiredEntity] {
        &self.groups
    }

    /// The document exactly as it was read.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
