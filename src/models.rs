use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

pub const RUNNER_TYPE_TAG: &str = "runner";
pub const TEAM_REFERENCE_TYPE_TAG: &str = "team_reference";

// ---- singular-resource envelope ----

/// A resource that travels wrapped under its own root key, e.g. `{"runner": {..}}`.
pub trait Resource {
    const ROOT_KEY: &'static str;
}

impl<T: Resource + ?Sized> Resource for &T {
    const ROOT_KEY: &'static str = T::ROOT_KEY;
}

/// Envelope around a single resource. Keys other than `T::ROOT_KEY` are ignored on decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload<T> {
    pub resource: T,
}

impl<T> Payload<T> {
    pub fn new(resource: T) -> Self {
        Self { resource }
    }

    pub fn into_inner(self) -> T {
        self.resource
    }
}

impl<T: Resource + Serialize> Serialize for Payload<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(T::ROOT_KEY, &self.resource)?;
        map.end()
    }
}

impl<'de, T: Resource + Deserialize<'de>> Deserialize<'de> for Payload<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PayloadVisitor<T>(PhantomData<T>);

        impl<'de, T: Resource + Deserialize<'de>> Visitor<'de> for PayloadVisitor<T> {
            type Value = Payload<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "an object with a `{}` key", T::ROOT_KEY)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut resource = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == T::ROOT_KEY {
                        if resource.is_some() {
                            return Err(de::Error::duplicate_field(T::ROOT_KEY));
                        }
                        resource = Some(map.next_value()?);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                resource
                    .map(Payload::new)
                    .ok_or_else(|| de::Error::missing_field(T::ROOT_KEY))
            }
        }

        deserializer.deserialize_map(PayloadVisitor(PhantomData))
    }
}

// ---- runner schema ----

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunnerType {
    Sidecar,
    Runbook,
}

impl RunnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerType::Sidecar => "sidecar",
            RunnerType::Runbook => "runbook",
        }
    }
}

impl fmt::Display for RunnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RunnerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sidecar" => Ok(RunnerType::Sidecar),
            "runbook" => Ok(RunnerType::Runbook),
            other => Err(format!("unknown runner type `{other}` (expected sidecar or runbook)")),
        }
    }
}

/// An automation actions runner as exposed by `/automation_actions/runners`.
///
/// Sidecar runners carry `teams` and `privileges`; runbook runners carry
/// `runbook_base_uri`, `runbook_api_key` and `last_seen`. Unset fields are
/// omitted on the wire so a request body decodes back to the same value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomationActionsRunner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    pub runner_type: RunnerType,
    #[serde(rename = "type", default = "runner_type_tag")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_base_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileges: Option<AutomationActionsPrivileges>,
}

fn runner_type_tag() -> String {
    RUNNER_TYPE_TAG.to_string()
}

impl Resource for AutomationActionsRunner {
    const ROOT_KEY: &'static str = "runner";
}

pub type AutomationActionsRunnerPayload = Payload<AutomationActionsRunner>;

impl AutomationActionsRunner {
    /// A create-ready runner: only the fields the caller must supply are set.
    pub fn new(name: impl Into<String>, runner_type: RunnerType) -> Self {
        Self {
            id: None,
            name: name.into(),
            summary: None,
            description: None,
            creation_time: None,
            last_seen: None,
            runner_type,
            kind: runner_type_tag(),
            status: None,
            runbook_base_uri: None,
            runbook_api_key: None,
            teams: None,
            privileges: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_runbook(mut self, base_uri: impl Into<String>, api_key: Option<String>) -> Self {
        self.runbook_base_uri = Some(base_uri.into());
        self.runbook_api_key = api_key;
        self
    }

    pub fn with_teams<I, S>(mut self, team_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.teams = Some(team_ids.into_iter().map(TeamReference::new).collect());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privileges = Some(AutomationActionsPrivileges {
            permissions: permissions.into_iter().map(Into::into).collect(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamReference {
    #[serde(rename = "type", default = "team_reference_type_tag")]
    pub kind: String,
    pub id: String,
}

fn team_reference_type_tag() -> String {
    TEAM_REFERENCE_TYPE_TAG.to_string()
}

impl TeamReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            kind: team_reference_type_tag(),
            id: id.into(),
        }
    }
}

impl Resource for TeamReference {
    const ROOT_KEY: &'static str = "team";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutomationActionsPrivileges {
    #[serde(default)]
    pub permissions: Vec<String>,
}

// ---- list ----

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListRunnersResponse {
    #[serde(default)]
    pub runners: Vec<AutomationActionsRunner>,
    /// Opaque cursor for the next page; not followed by this client.
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRunnersOptions {
    /// Filter runners whose name contains this string.
    pub name: Option<String>,
    pub limit: Option<u32>,
}

impl ListRunnersOptions {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}
