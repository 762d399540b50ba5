//! Mastodon hashtag timeline client.
use anyhow::Result;
use async_trait::async_trait;
use std::borrow::Cow;

use crate::mastodon::extract::{keyword_to_tag, post_from_status};
use crate::mastodon::types::Status;
use crate::{Platform, SearchPage, SearchWindow, SocialClient};
use magpie_http::{Auth, HttpClient, RequestOpts};

/// Hard server-side cap on `limit` for timeline endpoints.
const MAX_TIMELINE_PAGE: u32 = 40;

#[derive(Clone)]
pub struct MastodonApi {
    http: HttpClient,
    access_token: Option<String>,
}

impl MastodonApi {
    /// `endpoint` is the instance origin, e.g. `https://mastodon.social`.
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self> {
        let http = HttpClient::new(endpoint)?;
        Ok(Self { http, access_token })
    }
}

#[async_trait]
impl SocialClient for MastodonApi {
    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    async fn search_page(
        &self,
        keyword: &str,
        window: &SearchWindow,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchPage> {
        let tag = keyword_to_tag(keyword);
        if tag.is_empty() {
            tracing::debug!(keyword, "mastodon.search.unusable_keyword");
            return Ok(SearchPage::end());
        }

        let limit = page_size.clamp(1, MAX_TIMELINE_PAGE);
        let mut params: Vec<(&str, Cow<'_, str>)> =
            vec![("limit", limit.to_string().into())];
        if let Some(max_id) = cursor {
            params.push(("max_id", max_id.to_string().into()));
        }

        let auth = self.access_token.as_deref().map(Auth::Bearer);
        let statuses: Vec<Status> = self
            .http
            .get_json(
                &format!("api/v1/timelines/tag/{tag}"),
                RequestOpts {
                    auth,
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await?;

        let fetched = statuses.len();
        // Timelines run new-to-old; the last id on the page is the cursor for
        // the next one.
        let oldest_id = statuses.last().map(|s| s.id.clone());

        let mut saw_older_than_window = false;
        let posts: Vec<_> = statuses
            .iter()
            .map(|status| post_from_status(status, keyword))
            .filter(|post| match post.created_at {
                Some(at) if at < window.start => {
                    saw_older_than_window = true;
                    false
                }
                Some(at) => at <= window.end,
                None => true,
            })
            .collect();

        tracing::debug!(
            keyword,
            tag,
            fetched,
            kept = posts.len(),
            "mastodon.search.page"
        );

        let next = if saw_older_than_window || fetched == 0 {
            None
        } else {
            oldest_id
        };
        Ok(SearchPage { posts, next })
    }
}
