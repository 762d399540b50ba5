use time::OffsetDateTime;
use url::Url;

use crate::twitter::types::{Includes, Tweet};
use crate::{Platform, PostArtifact, PostMetrics};

/// Convert one tweet plus its response-level `includes` into a normalized
/// [`PostArtifact`].
pub fn post_from_tweet(tweet: &Tweet, includes: Option<&Includes>, keyword: &str) -> PostArtifact {
    // Resolve author (optional)
    let author = tweet.author_id.as_ref().and_then(|aid| {
        includes
            .and_then(|inc| inc.users.as_ref())
            .and_then(|users| users.iter().find(|u| &u.id == aid))
    });

    let author_handle = author.map(|u| u.username.clone());
    let author_display_name = author.and_then(|u| u.name.clone());

    // Canonical status URL
    let source_url = make_status_url(author_handle.as_deref(), &tweet.id);

    // Parse created_at (RFC 3339)
    let created_at = tweet.created_at.as_deref().and_then(|s| {
        OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).ok()
    });

    // External URLs
    let urls: Vec<Url> = tweet
        .entities
        .as_ref()
        .and_then(|e| e.urls.as_ref())
        .map(|list| {
            list.iter()
                .filter_map(|u| u.expanded_url.as_ref())
                .filter_map(|s| Url::parse(s).ok())
                .collect()
        })
        .unwrap_or_default();

    // Mentions
    let mentions: Vec<String> = tweet
        .entities
        .as_ref()
        .and_then(|e| e.mentions.as_ref())
        .map(|list| list.iter().map(|m| m.username.clone()).collect())
        .unwrap_or_default();

    // Hashtags
    let hashtags: Vec<String> = tweet
        .entities
        .as_ref()
        .and_then(|e| e.hashtags.as_ref())
        .map(|list| list.iter().map(|h| h.tag.clone()).collect())
        .unwrap_or_default();

    // Metrics
    let metrics = tweet.public_metrics.as_ref().map(|m| PostMetrics {
        like_count: m.like_count,
        repost_count: m.repost_count,
        reply_count: m.reply_count,
        quote_count: m.quote_count,
        bookmark_count: m.bookmark_count,
    });

    PostArtifact {
        platform: Platform::Twitter,
        external_id: tweet.id.clone(),
        author_handle,
        author_display_name,
        text: tweet.text.clone(),
        lang: tweet.lang.clone(),
        created_at,
        source_url,
        urls,
        mentions,
        hashtags,
        metrics,
        keyword: keyword.to_string(),
    }
}

/// Build a canonical X status URL if we know the handle; otherwise /i/web/status/{id}.
pub fn make_status_url(handle: Option<&str>, id: &str) -> Option<Url> {
    if let Some(h) = handle {
        Url::parse(&format!("https://x.com/{}/status/{}", h, id)).ok()
    } else {
        Url::parse(&format!("https://x.com/i/web/status/{}", id)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::types::SearchResponse;
    use serde_json::json;

    #[test]
    fn extract_minimal() {
        let v = json!({
            "data": [{
                "id": "123",
                "text": "hello",
                "author_id": "42",
                "lang": "en",
                "created_at": "2025-09-01T12:00:00Z",
                "entities": {
                    "mentions": [{"username":"bob"}],
                    "urls": [{"expanded_url":"https://example.com"}],
                    "hashtags": [{"tag":"intro"}]
                },
                "public_metrics": { "like_count": 1, "reply_count": 2, "quote_count": 0, "bookmark_count": 0 }
            }],
            "includes": {
                "users": [ { "id": "42", "username":"alice", "name":"Alice" } ]
            }
        });
        let resp: SearchResponse = serde_json::from_value(v).unwrap();
        let tweet = &resp.data.as_ref().unwrap()[0];
        let post = post_from_tweet(tweet, resp.includes.as_ref(), "hello");
        assert_eq!(post.external_id, "123");
        assert_eq!(post.author_handle.as_deref(), Some("alice"));
        assert_eq!(post.mentions, vec!["bob"]);
        assert_eq!(post.hashtags, vec!["intro"]);
        assert_eq!(post.urls.len(), 1);
        assert_eq!(post.keyword, "hello");
        assert_eq!(
            post.source_url.as_ref().map(|u| u.as_str()),
            Some("https://x.com/alice/status/123")
        );
    }

    #[test]
    fn status_url_falls_back_without_handle() {
        let url = make_status_url(None, "9").unwrap();
        assert_eq!(url.as_str(), "https://x.com/i/web/status/9");
    }
}
