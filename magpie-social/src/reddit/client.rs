//! Reddit `search.json` client.
use anyhow::Result;
use async_trait::async_trait;
use magpie_http::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::borrow::Cow;

use crate::reddit::extract::post_from_link;
use crate::reddit::types::Listing;
use crate::{Platform, SearchPage, SearchWindow, SocialClient};
use magpie_http::{HttpClient, RequestOpts};

#[derive(Clone)]
pub struct RedditApi {
    http: HttpClient,
    user_agent: String,
}

impl RedditApi {
    /// `endpoint` is the listing origin, `https://www.reddit.com` in production.
    pub fn new(endpoint: &str, user_agent: String) -> Result<Self> {
        let http = HttpClient::new(endpoint)?;
        Ok(Self { http, user_agent })
    }

    /// Coarse `t` bucket that covers the window; exact filtering happens on
    /// `created_utc` afterwards.
    fn time_bucket(window: &SearchWindow) -> &'static str {
        match window.span_days() {
            0..=1 => "day",
            2..=7 => "week",
            8..=31 => "month",
            _ => "year",
        }
    }
}

#[async_trait]
impl SocialClient for RedditApi {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn search_page(
        &self,
        keyword: &str,
        window: &SearchWindow,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchPage> {
        let page_size = page_size.clamp(1, 100);
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("q", keyword.into()),
            ("sort", "new".into()),
            ("t", Self::time_bucket(window).into()),
            ("limit", page_size.to_string().into()),
            ("raw_json", "1".into()),
        ];
        if let Some(after) = cursor {
            params.push(("after", after.to_string().into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| anyhow::anyhow!("invalid reddit user agent: {e}"))?,
        );

        let listing: Listing = self
            .http
            .get_json(
                "search.json",
                RequestOpts {
                    headers: Some(headers),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await?;

        let total = listing.data.children.len();
        let mut saw_older_than_window = false;
        let posts: Vec<_> = listing
            .data
            .children
            .iter()
            .filter(|child| child.kind == "t3")
            .map(|child| post_from_link(&child.data, keyword))
            .filter(|post| match post.created_at {
                Some(at) if at < window.start => {
                    saw_older_than_window = true;
                    false
                }
                Some(at) => at <= window.end,
                // Keep undated posts; the bucket filter already bounded them.
                None => true,
            })
            .collect();

        tracing::debug!(
            keyword,
            fetched = total,
            kept = posts.len(),
            "reddit.search.page"
        );

        // Results are sorted new-to-old, so once one post predates the window
        // every later page will too.
        let next = if saw_older_than_window || total == 0 {
            None
        } else {
            listing.data.after
        };
        Ok(SearchPage { posts, next })
    }
}
