use serde::{Deserialize, Serialize};

/// A tag as returned by `GET /tags`. `value` is the full hierarchical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Body of `PUT /tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertTagsRequest {
    pub tags: Vec<String>,
}

/// Body of `PUT /tags/assets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTagAssetsRequest {
    pub tag_ids: Vec<String>,
    pub asset_ids: Vec<String>,
}

/// Response of `PUT /tags/assets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkTagAssetsResponse {
    pub count: u64,
}
