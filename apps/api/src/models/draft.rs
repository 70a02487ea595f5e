use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single resume version as persisted in the draft medium.
///
/// Field names are camelCase on the wire so the persisted collection stays
/// readable by every client sharing the medium.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Lineage only. Never used for ownership or cleanup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied_job_id: Option<String>,
    #[serde(default)]
    pub content: DraftContent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Ordered, original casing kept, unique under case-insensitive comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<ExperienceEntry>>,
}

impl DraftContent {
    pub fn summary_str(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    pub fn skills_slice(&self) -> &[String] {
        self.skills.as_deref().unwrap_or(&[])
    }

    pub fn experience_slice(&self) -> &[ExperienceEntry] {
        self.experience.as_deref().unwrap_or(&[])
    }
}

/// One role block of a resume. Identity is the case-insensitive
/// `(role, company)` pair; see `drafts::experience::entry_matches`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Free text. Fill-only: merges never overwrite a non-empty value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

/// Structured content returned by the generation service, applied to the
/// active draft in one mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub experience: Option<Vec<ExperienceEntry>>,
}
