use time::OffsetDateTime;
use url::Url;

use crate::mastodon::types::Status;
use crate::{Platform, PostArtifact, PostMetrics};

/// Convert a Mastodon status into a normalized [`PostArtifact`].
pub fn post_from_status(status: &Status, keyword: &str) -> PostArtifact {
    let text = strip_html(&status.content);

    let created_at = status.created_at.as_deref().and_then(|s| {
        OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).ok()
    });

    let source_url = status
        .url
        .as_deref()
        .or(status.uri.as_deref())
        .and_then(|s| Url::parse(s).ok());

    let hashtags = status
        .tags
        .as_ref()
        .map(|tags| tags.iter().map(|t| t.name.clone()).collect())
        .unwrap_or_default();

    let mentions = status
        .mentions
        .as_ref()
        .map(|ms| ms.iter().map(|m| m.acct.clone()).collect())
        .unwrap_or_default();

    let metrics = PostMetrics {
        like_count: status.favourites_count,
        repost_count: status.reblogs_count,
        reply_count: status.replies_count,
        ..Default::default()
    };

    PostArtifact {
        platform: Platform::Mastodon,
        external_id: status.id.clone(),
        author_handle: status.account.as_ref().map(|a| a.acct.clone()),
        author_display_name: status
            .account
            .as_ref()
            .and_then(|a| a.display_name.clone())
            .filter(|n| !n.is_empty()),
        text,
        lang: status.language.clone(),
        created_at,
        source_url,
        urls: Vec::new(),
        mentions,
        hashtags,
        metrics: Some(metrics),
        keyword: keyword.to_string(),
    }
}

/// Reduce status HTML to readable text: paragraph/line breaks become
/// newlines, all other tags drop, common entities decode. Deliberately tiny;
/// toots are small and well-formed.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '<' {
            let rest = &html[i..];
            let end = match rest.find('>') {
                Some(e) => e,
                None => break,
            };
            let tag = rest[1..end].trim().to_ascii_lowercase();
            if tag == "br" || tag == "br/" || tag == "br /" || tag == "/p" {
                out.push('\n');
            }
            // Skip to the closing angle bracket.
            while let Some(&(j, _)) = chars.peek() {
                if j > i + end {
                    break;
                }
                chars.next();
            }
        } else {
            out.push(c);
        }
    }

    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    decoded.trim().to_string()
}

/// Lowercase a keyword into the alphanumeric form hashtag timelines expect.
pub fn keyword_to_tag(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_tags_and_keeps_breaks() {
        let html = "<p>Support was <b>useless</b> today.</p><p>Waited 2 hours &amp; gave up.</p>";
        assert_eq!(
            strip_html(html),
            "Support was useless today.\nWaited 2 hours & gave up."
        );
    }

    #[test]
    fn keyword_slugs_drop_punctuation() {
        assert_eq!(keyword_to_tag("Wi-Fi 6"), "wifi6");
        assert_eq!(keyword_to_tag("shipping"), "shipping");
    }

    #[test]
    fn extract_minimal() {
        let v = json!({
            "id": "111",
            "url": "https://mastodon.social/@sam/111",
            "created_at": "2025-09-01T10:00:00.000Z",
            "content": "<p>This app is <i>confusing</i></p>",
            "language": "en",
            "account": { "acct": "sam", "display_name": "Sam" },
            "favourites_count": 3,
            "reblogs_count": 1,
            "replies_count": 0,
            "tags": [{ "name": "apps" }],
            "mentions": []
        });
        let status: Status = serde_json::from_value(v).unwrap();
        let post = post_from_status(&status, "app");
        assert_eq!(post.external_id, "111");
        assert_eq!(post.text, "This app is confusing");
        assert_eq!(post.author_handle.as_deref(), Some("sam"));
        assert_eq!(post.hashtags, vec!["apps"]);
        assert!(post.created_at.is_some());
        assert_eq!(post.metrics.as_ref().unwrap().like_count, Some(3));
    }
}
