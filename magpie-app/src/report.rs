//! Export of a finished run: one JSON document carrying the rollups and
//! the analyzed posts, plus a flat CSV of per-post rows.

use crate::cli::ExportFormat;
use anyhow::{Context, Result};
use magpie_analysis::{AnalyzedPost, ResearchStats};
use magpie_web::PageArtifact;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use uuid::Uuid;

/// Everything the `run` command learned, in one serializable document.
#[derive(Serialize)]
pub struct ResearchReport {
    pub run_id: Uuid,
    pub keywords: Vec<String>,
    pub generated_at: OffsetDateTime,
    pub stats: ResearchStats,
    pub posts: Vec<AnalyzedPost>,
    pub pages: Vec<PageArtifact>,
}

impl ResearchReport {
    pub fn new(
        run_id: Uuid,
        keywords: Vec<String>,
        stats: ResearchStats,
        posts: Vec<AnalyzedPost>,
        pages: Vec<PageArtifact>,
    ) -> Self {
        Self {
            run_id,
            keywords,
            generated_at: OffsetDateTime::now_utc(),
            stats,
            posts,
            pages,
        }
    }
}

/// Write the report under `dir` and return the files created.
pub fn export(dir: &Path, format: ExportFormat, report: &ResearchReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating export directory {}", dir.display()))?;
    let stamp = report
        .generated_at
        .format(format_description!("[year][month][day]_[hour][minute][second]"))?;
    let mut written = Vec::new();

    if format.wants_json() {
        let path = dir.join(format!("research_results_{stamp}.json"));
        let file =
            File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), report)?;
        written.push(path);
    }

    if format.wants_csv() {
        let path = dir.join(format!("research_results_{stamp}.csv"));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for entry in &report.posts {
            writer.serialize(csv_row(entry)?)?;
        }
        writer.flush()?;
        written.push(path);
    }

    Ok(written)
}

/// One CSV line per post. Multi-line text survives as a quoted field.
#[derive(Serialize)]
struct CsvRow<'a> {
    platform: &'a str,
    external_id: &'a str,
    keyword: &'a str,
    author: &'a str,
    created_at: String,
    compound: f64,
    pain_point: &'a str,
    struggle: &'a str,
    text: &'a str,
}

fn csv_row(entry: &AnalyzedPost) -> Result<CsvRow<'_>> {
    let created_at = match entry.post.created_at {
        Some(ts) => ts.format(&Rfc3339)?,
        None => String::new(),
    };
    Ok(CsvRow {
        platform: entry.post.platform.as_str(),
        external_id: &entry.post.external_id,
        keyword: &entry.post.keyword,
        author: entry.post.author_handle.as_deref().unwrap_or(""),
        created_at,
        compound: entry.analysis.sentiment.compound,
        pain_point: entry.analysis.pain_point.map(|p| p.label()).unwrap_or(""),
        struggle: entry.analysis.struggle.map(|s| s.label()).unwrap_or(""),
        text: &entry.post.text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_analysis::{analyze_text, compile_stats};
    use magpie_social::{Platform, PostArtifact};

    fn sample_post() -> AnalyzedPost {
        let text = "The delivery was late and support was useless.".to_string();
        let analysis = analyze_text(&text);
        AnalyzedPost {
            post: PostArtifact {
                platform: Platform::Twitter,
                external_id: "t-1".into(),
                author_handle: Some("casey".into()),
                author_display_name: None,
                text,
                lang: None,
                created_at: Some(OffsetDateTime::now_utc()),
                source_url: None,
                urls: Vec::new(),
                mentions: Vec::new(),
                hashtags: Vec::new(),
                metrics: None,
                keyword: "headphones".into(),
            },
            analysis,
        }
    }

    #[test]
    fn export_writes_json_and_csv() {
        let dir = std::env::temp_dir().join(format!("magpie-report-{}", Uuid::new_v4()));
        let posts = vec![sample_post()];
        let stats = compile_stats(&posts, 5);
        let report = ResearchReport::new(
            Uuid::new_v4(),
            vec!["headphones".into()],
            stats,
            posts,
            Vec::new(),
        );

        let written = export(&dir, ExportFormat::Both, &report).unwrap();
        assert_eq!(written.len(), 2);

        let json = fs::read_to_string(&written[0]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["keywords"][0], "headphones");
        assert_eq!(parsed["stats"]["total_posts"], 1);

        let csv_text = fs::read_to_string(&written[1]).unwrap();
        let mut lines = csv_text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("platform,external_id,keyword"));
        let row = lines.next().unwrap();
        assert!(row.contains("twitter"));
        assert!(row.contains("Delivery Issues"));

        fs::remove_dir_all(&dir).ok();
    }
}
