use serde::{Deserialize, Serialize};

/// One toot from a timeline endpoint. `content` is HTML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub favourites_count: Option<u64>,
    #[serde(default)]
    pub reblogs_count: Option<u64>,
    #[serde(default)]
    pub replies_count: Option<u64>,
    #[serde(default)]
    pub tags: Option<Vec<TagRef>>,
    #[serde(default)]
    pub mentions: Option<Vec<MentionRef>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// `user` locally, `user@instance` for remote accounts.
    pub acct: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionRef {
    pub acct: String,
}
