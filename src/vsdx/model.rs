//! Diagram tree exchanged as JSON by the translate and export engines.
//!
//! Maps are keyed by the row's stable identifying attribute (see
//! [`schema::row_key`](super::schema::row_key)) and keep insertion order so
//! repeated serialization of the same walk is deterministic. Every collection
//! and leaf is optional; absent values are omitted from the JSON entirely,
//! which keeps exports minimal and lets the write-back pass distinguish
//! "caller removed this" from "caller left this alone".
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_u: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRowInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub prop_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_rows: Option<IndexMap<String, FieldInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_rows: Option<IndexMap<String, PropertyInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rows: Option<IndexMap<String, UserRowInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_u: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rows: Option<IndexMap<String, UserRowInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_rows: Option<IndexMap<String, PropertyInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapes: Option<IndexMap<String, ShapeInfo>>,
}

/// Root of the tree. Scalar fields mirror the container's core and extended
/// document properties; collections mirror the document sheet and the page
/// list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rows: Option<IndexMap<String, UserRowInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_rows: Option<IndexMap<String, PropertyInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<IndexMap<String, PageInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masters: Option<IndexMap<String, MasterInfo>>,
}

/// Fetch-or-insert into an optional keyed collection, allocating the
/// collection itself on first use.
pub(crate) fn ensure_entry<'a, T: Default>(
    map: &'a mut Option<IndexMap<String, T>>,
    key: &str,
) -> &'a mut T {
    map.get_or_insert_with(IndexMap::new)
        .entry(key.to_string())
        .or_default()
}

/// Read-only lookup into an optional keyed collection.
pub(crate) fn entry_of<'a, T>(map: &'a Option<IndexMap<String, T>>, key: &str) -> Option<&'a T> {
    map.as_ref().and_then(|m| m.get(key))
}
