use serde::{Deserialize, Serialize};

/// Top-level shape of every Reddit listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub children: Vec<Child>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    /// `t3` for link/self posts; anything else is skipped.
    pub kind: String,
    pub data: LinkData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkData {
    pub id: String,
    /// Fullname (`t3_<id>`), the form `after` cursors use.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Unix seconds; Reddit serialises this as a float.
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub num_comments: Option<u64>,
}
