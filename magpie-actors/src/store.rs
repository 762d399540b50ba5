//! SQLite-backed persistence actor for runs, posts, and pages.
//!
//! Writes are handled inline, so the mailbox doubles as the write queue: by
//! the time a `Flush` is dequeued every record ahead of it has committed,
//! which is what makes the analyzer's barrier an actual durability barrier.
//! A failed write is logged and skipped; one bad row never takes the run
//! down. Reads fan out to detached tasks against the pool.

use crate::actor::{Actor, Context};
use crate::{KeywordStatRow, PlatformStatRow, PostRow, ResearchContext, StoreMsg};
use anyhow::Result;
use magpie_analysis::AnalyzedPost;
use magpie_analysis::sentiment::NEGATIVE_COMPOUND;
use magpie_web::PageArtifact;
use sqlx::{Row, SqlitePool};
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct StoreActor {
    pool: SqlitePool,
}

impl StoreActor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Actor for StoreActor {
    type Msg = StoreMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            StoreMsg::InsertRun(run) => {
                if let Err(err) = insert_run(&self.pool, &run).await {
                    error!(run_id=%run.id, error = ?err, "store.insert_run.failed");
                }
            }
            StoreMsg::UpsertPost { run, entry } => {
                if let Err(err) = upsert_post(&self.pool, run, &entry).await {
                    error!(
                        platform=%entry.post.platform,
                        external_id=%entry.post.external_id,
                        error = ?err,
                        "store.upsert_post.failed"
                    );
                }
            }
            StoreMsg::UpsertPage { run, page } => {
                if let Err(err) = upsert_page(&self.pool, run, &page).await {
                    error!(url=%page.url, error = ?err, "store.upsert_page.failed");
                }
            }

            StoreMsg::SearchPosts {
                query,
                limit,
                reply,
            } => {
                let pool = self.pool.clone();
                tokio::spawn(async move {
                    let res = search_posts_fts(&pool, &query, limit).await;
                    if reply.send(res).is_err() {
                        debug!("store.search_posts.reply_dropped");
                    }
                });
            }
            StoreMsg::ListPosts { run, limit, reply } => {
                let pool = self.pool.clone();
                tokio::spawn(async move {
                    let res = list_posts(&pool, run, limit).await;
                    if reply.send(res).is_err() {
                        debug!("store.list_posts.reply_dropped");
                    }
                });
            }
            StoreMsg::ListPages { run, reply } => {
                let pool = self.pool.clone();
                tokio::spawn(async move {
                    let res = list_pages(&pool, run).await;
                    if reply.send(res).is_err() {
                        debug!("store.list_pages.reply_dropped");
                    }
                });
            }
            StoreMsg::KeywordStats { reply } => {
                let pool = self.pool.clone();
                tokio::spawn(async move {
                    let res = keyword_stats(&pool).await;
                    if reply.send(res).is_err() {
                        debug!("store.keyword_stats.reply_dropped");
                    }
                });
            }
            StoreMsg::PlatformStats { reply } => {
                let pool = self.pool.clone();
                tokio::spawn(async move {
                    let res = platform_stats(&pool).await;
                    if reply.send(res).is_err() {
                        debug!("store.platform_stats.reply_dropped");
                    }
                });
            }

            StoreMsg::Flush { reply } => {
                // Every write queued ahead of this message has already
                // committed, so the ack itself is the barrier.
                if reply.send(()).is_err() {
                    debug!("store.flush.reply_dropped");
                }
            }
        }
        Ok(())
    }
}

/// Create the schema if missing. Safe to run on every startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS research_run (
          id         TEXT PRIMARY KEY,
          keywords   TEXT NOT NULL,
          started_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS post (
          platform    TEXT NOT NULL,
          external_id TEXT NOT NULL,
          run_id      TEXT,
          keyword     TEXT NOT NULL,
          author      TEXT,
          text        TEXT NOT NULL,
          created_at  TEXT,
          compound    REAL NOT NULL,
          pain_point  TEXT,
          struggle    TEXT,
          payload     TEXT NOT NULL,
          updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (platform, external_id)
        );

        CREATE TABLE IF NOT EXISTS page (
          url          TEXT PRIMARY KEY,
          run_id       TEXT,
          domain       TEXT NOT NULL,
          title        TEXT,
          http_status  INTEGER NOT NULL,
          depth        INTEGER NOT NULL,
          retrieved_at TEXT NOT NULL,
          payload      TEXT NOT NULL,
          updated_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS fts_post USING fts5(
          text, keyword, author,
          content='post',
          content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS post_ai AFTER INSERT ON post BEGIN
          INSERT INTO fts_post(rowid, text, keyword, author)
          VALUES (new.rowid, new.text, new.keyword, new.author);
        END;

        CREATE TRIGGER IF NOT EXISTS post_ad AFTER DELETE ON post BEGIN
          INSERT INTO fts_post(fts_post, rowid, text, keyword, author)
          VALUES ('delete', old.rowid, old.text, old.keyword, old.author);
        END;

        CREATE TRIGGER IF NOT EXISTS post_au AFTER UPDATE ON post BEGIN
          INSERT INTO fts_post(fts_post, rowid, text, keyword, author)
          VALUES ('delete', old.rowid, old.text, old.keyword, old.author);
          INSERT INTO fts_post(rowid, text, keyword, author)
          VALUES (new.rowid, new.text, new.keyword, new.author);
        END;

        CREATE INDEX IF NOT EXISTS idx_post_run     ON post(run_id);
        CREATE INDEX IF NOT EXISTS idx_post_keyword ON post(keyword);
        CREATE INDEX IF NOT EXISTS idx_page_run     ON page(run_id);
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_run(pool: &SqlitePool, run: &ResearchContext) -> Result<()> {
    let keywords = serde_json::to_string(&run.keywords)?;
    let started_at = run.started_at.format(&Rfc3339)?;
    let res = sqlx::query(
        r#"INSERT INTO research_run (id, keywords, started_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(id) DO NOTHING"#,
    )
    .bind(run.id.to_string())
    .bind(keywords)
    .bind(started_at)
    .execute(pool)
    .await?;
    info!(run_id=%run.id, rows=res.rows_affected(), "store.insert_run");
    Ok(())
}

async fn upsert_post(pool: &SqlitePool, run: Uuid, entry: &AnalyzedPost) -> Result<()> {
    let post = &entry.post;
    let analysis = &entry.analysis;
    let created_at = match post.created_at {
        Some(ts) => Some(ts.format(&Rfc3339)?),
        None => None,
    };
    let payload = serde_json::to_string(entry)?;

    let res = sqlx::query(
        r#"INSERT INTO post
           (platform, external_id, run_id, keyword, author, text, created_at,
            compound, pain_point, struggle, payload, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, datetime('now'))
           ON CONFLICT(platform, external_id) DO UPDATE SET
             run_id=excluded.run_id,
             keyword=excluded.keyword,
             author=excluded.author,
             text=excluded.text,
             created_at=excluded.created_at,
             compound=excluded.compound,
             pain_point=excluded.pain_point,
             struggle=excluded.struggle,
             payload=excluded.payload,
             updated_at=excluded.updated_at"#,
    )
    .bind(post.platform.as_str())
    .bind(post.external_id.as_str())
    .bind(run.to_string())
    .bind(post.keyword.as_str())
    .bind(post.author_handle.as_deref())
    .bind(post.text.as_str())
    .bind(created_at)
    .bind(analysis.sentiment.compound)
    .bind(analysis.pain_point.map(|p| p.label()))
    .bind(analysis.struggle.map(|s| s.label()))
    .bind(payload)
    .execute(pool)
    .await?;
    debug!(
        platform=%post.platform,
        external_id=%post.external_id,
        rows=res.rows_affected(),
        "store.upsert_post"
    );
    Ok(())
}

async fn upsert_page(pool: &SqlitePool, run: Uuid, page: &PageArtifact) -> Result<()> {
    let retrieved_at = page.retrieved_at.format(&Rfc3339)?;
    let payload = serde_json::to_string(page)?;

    let res = sqlx::query(
        r#"INSERT INTO page
           (url, run_id, domain, title, http_status, depth, retrieved_at,
            payload, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
           ON CONFLICT(url) DO UPDATE SET
             run_id=excluded.run_id,
             domain=excluded.domain,
             title=excluded.title,
             http_status=excluded.http_status,
             depth=excluded.depth,
             retrieved_at=excluded.retrieved_at,
             payload=excluded.payload,
             updated_at=excluded.updated_at"#,
    )
    .bind(page.url.as_str())
    .bind(run.to_string())
    .bind(page.domain.as_str())
    .bind(page.title.as_deref())
    .bind(i64::from(page.http_status))
    .bind(i64::from(page.depth))
    .bind(retrieved_at)
    .bind(payload)
    .execute(pool)
    .await?;
    debug!(
        url=%page.url,
        rows=res.rows_affected(),
        "store.upsert_page"
    );
    Ok(())
}

pub async fn search_posts_fts(pool: &SqlitePool, q: &str, limit: i64) -> Result<Vec<PostRow>> {
    debug!(query=%q, limit, "store.search_posts.start");
    let sanitized = sanitize_fts_query(q);
    if sanitized.is_none() {
        info!(query=%q, "store.search_posts.skip_fts");
    }
    let mut rows = if let Some(ref fts_query) = sanitized {
        sqlx::query(
            r#"
            SELECT
              p.platform,
              p.external_id,
              p.keyword,
              p.author,
              substr(p.text, 1, 2000) AS text,
              p.compound,
              p.pain_point,
              p.struggle,
              p.created_at,
              p.run_id
            FROM fts_post
            JOIN post p ON p.rowid = fts_post.rowid
            WHERE fts_post MATCH ?
            ORDER BY bm25(fts_post) ASC
            LIMIT ?
            "#,
        )
        .bind(fts_query)
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        Vec::new()
    };

    let used_fallback;
    if rows.is_empty() {
        info!(query=%q, limit, "store.search_posts.fallback_like");
        let pat = format!("%{}%", q);
        rows = sqlx::query(
            r#"
            SELECT
              platform,
              external_id,
              keyword,
              author,
              substr(text, 1, 2000) AS text,
              compound,
              pain_point,
              struggle,
              created_at,
              run_id
            FROM post
            WHERE (text LIKE ?1 OR keyword LIKE ?1 OR author LIKE ?1)
            ORDER BY updated_at DESC
            LIMIT ?2
            "#,
        )
        .bind(pat)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        used_fallback = true;
    } else {
        used_fallback = false;
    }
    info!(
        query=%q,
        rows=rows.len(),
        fallback=used_fallback,
        "store.search_posts"
    );

    Ok(rows.into_iter().map(|r| post_row(&r)).collect())
}

fn post_row(r: &sqlx::sqlite::SqliteRow) -> PostRow {
    PostRow {
        platform: r.try_get::<String, _>("platform").unwrap_or_default(),
        external_id: r.try_get::<String, _>("external_id").unwrap_or_default(),
        keyword: r.try_get::<String, _>("keyword").unwrap_or_default(),
        author: r.try_get::<Option<String>, _>("author").unwrap_or(None),
        text: r.try_get::<String, _>("text").unwrap_or_default(),
        compound: r.try_get::<f64, _>("compound").unwrap_or_default(),
        pain_point: r.try_get::<Option<String>, _>("pain_point").unwrap_or(None),
        struggle: r.try_get::<Option<String>, _>("struggle").unwrap_or(None),
        created_at: r.try_get::<Option<String>, _>("created_at").unwrap_or(None),
        run_id: r.try_get::<Option<String>, _>("run_id").unwrap_or(None),
    }
}

async fn list_posts(pool: &SqlitePool, run: Option<Uuid>, limit: i64) -> Result<Vec<AnalyzedPost>> {
    let (rid1, rid2) = match run {
        Some(r) => (Some(r.to_string()), Some(r.to_string())),
        None => (None, None),
    };
    let rows = sqlx::query(
        r#"SELECT payload FROM post
           WHERE (?1 IS NULL OR run_id = ?2)
           ORDER BY updated_at DESC
           LIMIT ?3"#,
    )
    .bind(rid1) // ?1
    .bind(rid2) // ?2
    .bind(limit) // ?3
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let payload = r.try_get::<String, _>("payload").unwrap_or_default();
        match serde_json::from_str::<AnalyzedPost>(&payload) {
            Ok(entry) => out.push(entry),
            Err(err) => warn!(error = ?err, "store.list_posts.bad_payload"),
        }
    }
    info!(run=?run, rows=out.len(), "store.list_posts");
    Ok(out)
}

async fn list_pages(pool: &SqlitePool, run: Option<Uuid>) -> Result<Vec<PageArtifact>> {
    let (rid1, rid2) = match run {
        Some(r) => (Some(r.to_string()), Some(r.to_string())),
        None => (None, None),
    };
    let rows = sqlx::query(
        r#"SELECT payload FROM page
           WHERE (?1 IS NULL OR run_id = ?2)
           ORDER BY updated_at DESC"#,
    )
    .bind(rid1) // ?1
    .bind(rid2) // ?2
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let payload = r.try_get::<String, _>("payload").unwrap_or_default();
        match serde_json::from_str::<PageArtifact>(&payload) {
            Ok(page) => out.push(page),
            Err(err) => warn!(error = ?err, "store.list_pages.bad_payload"),
        }
    }
    info!(run=?run, rows=out.len(), "store.list_pages");
    Ok(out)
}

async fn keyword_stats(pool: &SqlitePool) -> Result<Vec<KeywordStatRow>> {
    let rows = sqlx::query(
        r#"SELECT
             keyword,
             platform,
             COUNT(*) AS posts,
             SUM(CASE WHEN compound <= ?1 THEN 1 ELSE 0 END) AS negative
           FROM post
           GROUP BY keyword, platform
           ORDER BY posts DESC, keyword ASC"#,
    )
    .bind(NEGATIVE_COMPOUND)
    .fetch_all(pool)
    .await?;
    info!(rows=rows.len(), "store.keyword_stats");

    Ok(rows
        .into_iter()
        .map(|r| KeywordStatRow {
            keyword: r.try_get::<String, _>("keyword").unwrap_or_default(),
            platform: r.try_get::<String, _>("platform").unwrap_or_default(),
            posts: r.try_get::<i64, _>("posts").unwrap_or(0),
            negative: r.try_get::<i64, _>("negative").unwrap_or(0),
        })
        .collect())
}

async fn platform_stats(pool: &SqlitePool) -> Result<Vec<PlatformStatRow>> {
    let rows = sqlx::query(
        r#"SELECT
             platform,
             COUNT(*) AS posts,
             COUNT(DISTINCT keyword) AS keywords,
             AVG(compound) AS mean_compound
           FROM post
           GROUP BY platform
           ORDER BY posts DESC"#,
    )
    .fetch_all(pool)
    .await?;
    info!(rows=rows.len(), "store.platform_stats");

    Ok(rows
        .into_iter()
        .map(|r| PlatformStatRow {
            platform: r.try_get::<String, _>("platform").unwrap_or_default(),
            posts: r.try_get::<i64, _>("posts").unwrap_or(0),
            keywords: r.try_get::<i64, _>("keywords").unwrap_or(0),
            mean_compound: r.try_get::<f64, _>("mean_compound").unwrap_or_default(),
        })
        .collect())
}

fn sanitize_fts_query(raw: &str) -> Option<String> {
    let tokens: Vec<String> = raw
        .split_whitespace()
        .filter_map(|word| {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned.to_ascii_lowercase())
            }
        })
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
