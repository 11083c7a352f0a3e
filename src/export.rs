//! CSV artifacts for completed runs.
//!
//! Artifacts are written to the configured output directory and served
//! back by file name. Quoting follows RFC 4180: a field containing a comma,
//! quote, CR or LF is wrapped in quotes with inner quotes doubled.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use aeo_search::{OrganicResult, Provider};

use crate::error::{Result, RunnerError};
use crate::subject::Subject;
use crate::workflow::VisibilityResult;

const VISIBILITY_HEADER: &[&str] = &[
    "product_id",
    "product_name",
    "brand",
    "retailer_domain",
    "overall_aeo_score",
    "engines_with_presence",
    "gemini_score",
    "gemini_domain_found",
    "gemini_positions",
    "perplexity_score",
    "perplexity_domain_found",
    "perplexity_positions",
    "openai_score",
    "openai_domain_found",
    "openai_positions",
];

const CITATION_HEADER: &[&str] = &["engine", "position", "url", "title"];

const SEARCH_HEADER: &[&str] = &[
    "product_name",
    "brand",
    "sku",
    "search_position",
    "result_title",
    "result_link",
    "result_snippet",
];

/// Placeholder for a value the catalogue or search engine left out.
const NOT_AVAILABLE: &str = "N/A";

/// Same-second artifacts for one product before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes CSV artifacts into one directory.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    /// Create an exporter for `output_dir`. The directory is created on the
    /// first write.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The directory artifacts are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the score summary and every provider's citations.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Export`] if the file cannot be written.
    pub fn write_visibility(&self, result: &VisibilityResult) -> Result<PathBuf> {
        let stem = format!(
            "aeo-score-{}-{}",
            file_safe(&result.product_id),
            chrono::Utc::now().timestamp()
        );

        let mut summary = vec![
            result.product_id.clone(),
            result.product_name.clone(),
            result.brand.clone(),
            result.retailer_domain.clone(),
            format!("{:.1}", result.overall_score),
            result.engines_with_presence.to_string(),
        ];
        for provider in Provider::all() {
            let score = result.per_provider.get(provider).cloned().unwrap_or_default();
            summary.push(score.score.to_string());
            summary.push(score.domain_found.to_string());
            summary.push(format_positions(&score.matched_positions));
        }

        let mut out = String::new();
        push_row(&mut out, VISIBILITY_HEADER);
        push_row(&mut out, &summary);
        out.push_str("\r\n");
        push_row(&mut out, CITATION_HEADER);
        for provider in Provider::all() {
            let Some(citations) = result.citations_by_provider.get(provider) else {
                continue;
            };
            for citation in citations {
                let position = citation
                    .position
                    .map(|p| p.to_string())
                    .unwrap_or_default();
                push_row(
                    &mut out,
                    &[
                        provider.name(),
                        position.as_str(),
                        citation.url.as_str(),
                        citation.title.as_str(),
                    ],
                );
            }
        }

        self.write(&stem, &out)
    }

    /// Write one row per organic search result.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Export`] if the file cannot be written.
    pub fn write_search(&self, subject: &Subject, results: &[OrganicResult]) -> Result<PathBuf> {
        let sku = subject.identifier.as_deref().unwrap_or("unknown");
        let stem = format!(
            "product-search-{}-{}",
            file_safe(sku),
            chrono::Utc::now().timestamp()
        );

        let sku_cell = subject.identifier.as_deref().unwrap_or(NOT_AVAILABLE);
        let mut out = String::new();
        push_row(&mut out, SEARCH_HEADER);
        for result in results {
            let position = result
                .position
                .map_or_else(|| NOT_AVAILABLE.to_owned(), |p| p.to_string());
            push_row(
                &mut out,
                &[
                    subject.name.as_str(),
                    subject.brand.as_str(),
                    sku_cell,
                    position.as_str(),
                    result.title.as_str(),
                    result.link.as_str(),
                    result.snippet.as_str(),
                ],
            );
        }

        self.write(&stem, &out)
    }

    /// Resolve an artifact by bare file name.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Precondition`] for names containing a path separator
    /// or `..`; [`RunnerError::NotFound`] when no such file exists.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.contains("..")
        {
            return Err(RunnerError::Precondition(format!(
                "invalid file name: {file_name}"
            )));
        }
        let path = self.output_dir.join(file_name);
        if !path.is_file() {
            return Err(RunnerError::NotFound(format!("file {file_name}")));
        }
        Ok(path)
    }

    /// Write `content` to `<stem>.csv`, or `<stem>-<n>.csv` when an earlier
    /// artifact already holds that name. Existing artifacts are never
    /// overwritten.
    fn write(&self, stem: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            RunnerError::Export(format!("{}: {e}", self.output_dir.display()))
        })?;

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 1 {
                format!("{stem}.csv")
            } else {
                format!("{stem}-{attempt}.csv")
            };
            let path = self.output_dir.join(file_name);
            let mut file = match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(RunnerError::Export(format!("{}: {e}", path.display()))),
            };
            file.write_all(content.as_bytes())
                .map_err(|e| RunnerError::Export(format!("{}: {e}", path.display())))?;
            tracing::info!(path = %path.display(), bytes = content.len(), "CSV exported");
            return Ok(path);
        }

        Err(RunnerError::Export(format!(
            "no free file name for {stem} in {}",
            self.output_dir.display()
        )))
    }
}

/// Render matched positions as `[1, 5]`.
fn format_positions(positions: &[u32]) -> String {
    let inner: Vec<String> = positions.iter().map(u32::to_string).collect();
    format!("[{}]", inner.join(", "))
}

/// Replace characters that cannot appear in a file name.
fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect::<String>()
        .replace("..", "_")
}

fn push_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field.as_ref());
    }
    out.push_str("\r\n");
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
