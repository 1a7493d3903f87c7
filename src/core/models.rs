

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Job tag carried by legacy chunks and papers indexed before scoping existed.
/// Such data stays visible under every job scope.
pub const UNSCOPED_JOB_ID: i64 = 0;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub paper_id: i64,
    #[serde(default)]
    pub job_id: i64,
    #[serde(default)]
    pub section_label: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub external_paper_id: String,
    pub text: String,
}

impl Chunk {
    pub fn new(
        chunk_id: impl Into<String>,
        paper_id: i64,
        section_label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            paper_id,
            job_id: UNSCOPED_JOB_ID,
            section_label: section_label.into(),
            title: String::new(),
            external_paper_id: String::new(),
            text: text.into(),
        }
    }

    pub fn with_job(mut self, job_id: i64) -> Self {
        self.job_id = job_id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>, external_paper_id: impl Into<String>) -> Self {
        self.title = title.into();
        self.external_paper_id = external_paper_id.into();
        self
    }

    #[inline]
    pub fn is_unscoped(&self) -> bool {
        self.job_id == UNSCOPED_JOB_ID
    }
}


#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub job_id: Option<i64>,
    pub paper_id: Option<i64>,
}

impl SearchFilter {
    pub fn new(job_id: Option<i64>, paper_id: Option<i64>) -> Self {
        Self { job_id, paper_id }
    }

    /// Scoped searches also admit unscoped legacy chunks (`job_id == 0`).
    pub fn admits(&self, chunk: &Chunk) -> bool {
        let job_ok = match self.job_id {
            Some(job_id) => chunk.job_id == job_id || chunk.is_unscoped(),
            None => true,
        };
        let paper_ok = self.paper_id.is_none_or(|paper_id| chunk.paper_id == paper_id);
        job_ok && paper_ok
    }
}


#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PaperFields {
    pub external_id: String,
    pub title: String,
    pub published: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub citation_count: u32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub main_problem: String,
    pub key_innovation: String,
    pub core_methodology: String,
    pub major_results: String,
    pub limitations: String,
    pub research_gaps: String,
}

impl PaperFields {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Leading four digits of `published`, or 0.
    pub fn year(&self) -> i32 {
        self.published
            .get(..4)
            .and_then(|y| y.parse().ok())
            .unwrap_or(0)
    }
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reference {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Reference {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_admits_unscoped_legacy_chunks() {
        let scoped = Chunk::new("c1", 1, "intro", "text").with_job(7);
        let other = Chunk::new("c2", 2, "intro", "text").with_job(8);
        let legacy = Chunk::new("c3", 3, "intro", "text");

        let filter = SearchFilter::new(Some(7), None);
        assert!(filter.admits(&scoped));
        assert!(!filter.admits(&other));
        assert!(filter.admits(&legacy));
    }

    #[test]
    fn test_filter_by_paper() {
        let chunk = Chunk::new("c1", 1, "intro", "text").with_job(7);
        assert!(SearchFilter::new(None, Some(1)).admits(&chunk));
        assert!(!SearchFilter::new(Some(7), Some(2)).admits(&chunk));
    }

    #[test]
    fn test_year_parsing() {
        let mut fields = PaperFields::new("1706.03762", "Attention Is All You Need");
        fields.published = "2017-06-12T17:57:34Z".to_string();
        assert_eq!(fields.year(), 2017);

        fields.published = "n/a".to_string();
        assert_eq!(fields.year(), 0);
    }
}
