use time::OffsetDateTime;
use url::Url;

use crate::reddit::types::LinkData;
use crate::{Platform, PostArtifact, PostMetrics};

/// Convert a Reddit link post into a normalized [`PostArtifact`].
///
/// The artifact text joins title and selftext; link-only posts keep the
/// target URL in `urls` instead.
pub fn post_from_link(link: &LinkData, keyword: &str) -> PostArtifact {
    let title = link.title.as_deref().unwrap_or("").trim();
    let selftext = link.selftext.as_deref().unwrap_or("").trim();
    let text = if selftext.is_empty() {
        title.to_string()
    } else if title.is_empty() {
        selftext.to_string()
    } else {
        format!("{title}\n\n{selftext}")
    };

    let created_at = link
        .created_utc
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs as i64).ok());

    let source_url = link
        .permalink
        .as_deref()
        .and_then(|p| Url::parse(&format!("https://www.reddit.com{p}")).ok());

    // Outbound link for non-self posts; self posts point `url` back at the
    // permalink, which we already keep as source_url.
    let urls = link
        .url
        .as_deref()
        .filter(|u| !u.contains("reddit.com"))
        .and_then(|u| Url::parse(u).ok())
        .into_iter()
        .collect();

    let metrics = PostMetrics {
        like_count: link.score.map(|s| s.max(0) as u64),
        reply_count: link.num_comments,
        ..Default::default()
    };

    PostArtifact {
        platform: Platform::Reddit,
        external_id: link
            .name
            .clone()
            .unwrap_or_else(|| format!("t3_{}", link.id)),
        author_handle: link.author.clone(),
        author_display_name: None,
        text,
        lang: None,
        created_at,
        source_url,
        urls,
        mentions: Vec::new(),
        hashtags: link.subreddit.iter().cloned().collect(),
        metrics: Some(metrics),
        keyword: keyword.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reddit::types::Listing;
    use serde_json::json;

    #[test]
    fn extract_self_post() {
        let v = json!({
            "data": {
                "after": "t3_next",
                "children": [{
                    "kind": "t3",
                    "data": {
                        "id": "abc",
                        "name": "t3_abc",
                        "title": "Shipping was late",
                        "selftext": "Took three weeks to arrive.",
                        "author": "grumbler",
                        "subreddit": "mildlyinfuriating",
                        "permalink": "/r/mildlyinfuriating/comments/abc/shipping/",
                        "url": "https://www.reddit.com/r/mildlyinfuriating/comments/abc/shipping/",
                        "created_utc": 1735689600.0,
                        "score": 41,
                        "num_comments": 7
                    }
                }]
            }
        });
        let listing: Listing = serde_json::from_value(v).unwrap();
        let post = post_from_link(&listing.data.children[0].data, "shipping");
        assert_eq!(post.external_id, "t3_abc");
        assert_eq!(post.text, "Shipping was late\n\nTook three weeks to arrive.");
        assert_eq!(post.author_handle.as_deref(), Some("grumbler"));
        assert!(post.urls.is_empty());
        assert_eq!(post.metrics.as_ref().unwrap().like_count, Some(41));
        assert_eq!(post.metrics.as_ref().unwrap().reply_count, Some(7));
        assert_eq!(
            post.source_url.as_ref().map(|u| u.as_str()),
            Some("https://www.reddit.com/r/mildlyinfuriating/comments/abc/shipping/")
        );
    }

    #[test]
    fn negative_scores_floor_at_zero() {
        let link = LinkData {
            id: "x".into(),
            name: None,
            title: Some("bad take".into()),
            selftext: None,
            author: None,
            subreddit: None,
            permalink: None,
            url: Some("https://example.com/article".into()),
            created_utc: None,
            score: Some(-12),
            num_comments: Some(0),
        };
        let post = post_from_link(&link, "take");
        assert_eq!(post.external_id, "t3_x");
        assert_eq!(post.metrics.as_ref().unwrap().like_count, Some(0));
        assert_eq!(post.urls.len(), 1);
    }
}
