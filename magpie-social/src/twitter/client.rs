//! Wrapper around the Twitter/X recent search API with Magpie defaults.
//!
//! Handles auth, request parameter shaping, and safe time windows before
//! delegating to the shared HTTP client. Pagination is page-at-a-time via
//! `next_token` so the caller can rate-gate every request.
use anyhow::Result;
use async_trait::async_trait;
use std::borrow::Cow;
use time::{Duration, OffsetDateTime};

use crate::twitter::extract::post_from_tweet;
use crate::twitter::types::SearchResponse;
use crate::{Platform, SearchPage, SearchWindow, SocialClient};
use magpie_http::{Auth, HttpClient, RequestOpts};

const TWEET_FIELDS: &str = "created_at,lang,entities,public_metrics";

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    bearer: String,
}

impl TwitterApi {
    /// `endpoint` is the API origin, `https://api.twitter.com` in production.
    pub fn new(endpoint: &str, bearer_token: String) -> Result<Self> {
        let http = HttpClient::new(endpoint)?;
        Ok(Self {
            http,
            bearer: bearer_token,
        })
    }

    async fn recent_search(
        &self,
        query: &str,
        window: &SearchWindow,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<SearchResponse> {
        let max_results = max_results.clamp(10, 100);

        // Twitter constraints for /2/tweets/search/recent: the window must sit
        // fully within the last 7 days, with end <= now - 10s. Clamp whatever
        // the caller asked for into a compliant range, with some slack so the
        // request is safely behind "now" when it lands.
        let now = OffsetDateTime::now_utc();
        let latest_end = now - Duration::seconds(20);
        let earliest_start = now - Duration::days(7) + Duration::seconds(60);

        let start = window.start.max(earliest_start);
        let end = window.end.min(latest_end);
        if start >= end {
            // Caller asked for a window entirely outside what the API serves.
            tracing::debug!(query, "twitter.search.window_empty");
            return Ok(SearchResponse {
                data: None,
                includes: None,
                meta: None,
            });
        }

        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("query", query.into()),
            ("max_results", max_results.to_string().into()),
            ("tweet.fields", TWEET_FIELDS.into()),
            ("expansions", "author_id".into()),
            ("user.fields", "name,username".into()),
        ];

        params.push((
            "start_time",
            start
                .format(&time::format_description::well_known::Rfc3339)?
                .into(),
        ));
        params.push((
            "end_time",
            end.format(&time::format_description::well_known::Rfc3339)?
                .into(),
        ));

        if let Some(token) = next_token {
            params.push(("next_token", token.to_string().into()));
        }

        let resp: SearchResponse = self
            .http
            .get_json(
                "2/tweets/search/recent",
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.bearer)),
                    query: Some(params),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await?;

        tracing::debug!(
            result_count = ?resp.meta.as_ref().and_then(|m| m.result_count),
            has_next = resp.meta.as_ref().and_then(|m| m.next_token.as_ref()).is_some(),
            "twitter.search.page"
        );
        Ok(resp)
    }
}

#[async_trait]
impl SocialClient for TwitterApi {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn search_page(
        &self,
        keyword: &str,
        window: &SearchWindow,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchPage> {
        let resp = self
            .recent_search(keyword, window, page_size, cursor)
            .await?;

        let includes = resp.includes.as_ref();
        let posts = resp
            .data
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|tweet| post_from_tweet(tweet, includes, keyword))
            .collect::<Vec<_>>();

        // The API already enforced the window, so the token is the only
        // stop condition we need.
        let next = resp.meta.and_then(|m| m.next_token);
        Ok(SearchPage { posts, next })
    }
}
