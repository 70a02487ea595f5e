//! Version Lifecycle Controller — lineage, cross-draft merges and job
//! stamping, layered on top of the `DraftStore`.
//!
//! Unmet preconditions (no active draft, unknown id) are reported through the
//! return value, never as errors.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::drafts::experience::{entry_matches, merge_bullets, merge_experience};
use crate::drafts::skills::merge_ordered_skills;
use crate::drafts::store::DraftStore;
use crate::models::draft::{DraftContent, DraftRecord, ExperienceEntry, GeneratedContent};

/// Which parts of a source draft to carry into a target draft. Any subset
/// may be enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    pub apply_summary: bool,
    pub apply_skills_added: bool,
    pub remove_skills_not_in_source: bool,
    pub merge_experience_bullets: bool,
    pub add_missing_experience_entries: bool,
}

/// Clones the active draft under a fresh id and timestamp, recording the
/// original as `source_version_id`. The active pointer does not move.
pub fn duplicate_active(store: &mut DraftStore, new_name: Option<&str>) -> Option<String> {
    let original = store.active()?.clone();
    let source_id = original.id.clone();
    let name = new_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} (copy)", original.name));

    let copy = DraftRecord {
        id: Uuid::new_v4().to_string(),
        name,
        created_at: Utc::now(),
        source_version_id: Some(source_id.clone()),
        ..original
    };
    let id = copy.id.clone();
    store.insert_front(copy);
    info!("Duplicated draft {source_id} as {id}");
    Some(id)
}

/// Skills pass: additions first, then the source filter over the result.
fn merge_skills(target: &[String], source: &[String], options: &MergeOptions) -> Vec<String> {
    let mut result = target.to_vec();
    if options.apply_skills_added {
        let present: HashSet<String> = result.iter().cloned().collect();
        result.extend(source.iter().filter(|s| !present.contains(*s)).cloned());
    }
    if options.remove_skills_not_in_source {
        let keep: HashSet<&str> = source.iter().map(String::as_str).collect();
        result.retain(|s| keep.contains(s.as_str()));
    }
    result
}

/// Experience pass: each source entry either feeds bullets into its match
/// or, when unmatched, is appended verbatim.
fn merge_entries(
    target: &mut Vec<ExperienceEntry>,
    source: &[ExperienceEntry],
    options: &MergeOptions,
) {
    for entry in source {
        match target.iter_mut().find(|t| entry_matches(t, entry)) {
            Some(existing) => {
                if options.merge_experience_bullets {
                    merge_bullets(&mut existing.bullets, &entry.bullets);
                }
            }
            None => {
                if options.add_missing_experience_entries {
                    target.push(entry.clone());
                }
            }
        }
    }
}

/// Computes the merged content of `target` with the selected parts of `source`.
pub fn merge_content(target: DraftContent, source: &DraftContent, options: &MergeOptions) -> DraftContent {
    let mut merged = target;

    if options.apply_summary {
        if let Some(summary) = source.summary.as_ref().filter(|s| !s.trim().is_empty()) {
            merged.summary = Some(summary.clone());
        }
    }

    if options.apply_skills_added || options.remove_skills_not_in_source {
        merged.skills = Some(merge_skills(
            merged.skills_slice(),
            source.skills_slice(),
            options,
        ));
    }

    if options.merge_experience_bullets || options.add_missing_experience_entries {
        let mut experience = merged.experience.take().unwrap_or_default();
        merge_entries(&mut experience, source.experience_slice(), options);
        merged.experience = Some(experience);
    }

    merged
}

/// Applies the selected sections of draft `source_id` onto `target_id`.
/// Returns false when either draft is unknown.
pub fn merge_draft_sections(
    store: &mut DraftStore,
    source_id: &str,
    target_id: &str,
    options: &MergeOptions,
) -> bool {
    let Some(source) = store.get(source_id).map(|r| r.content.clone()) else {
        return false;
    };
    if store.get(target_id).is_none() {
        return false;
    }
    debug!("Merging draft {source_id} into {target_id} with {options:?}");
    store.update_content(target_id, |content| merge_content(content, &source, options))
}

/// Stamps the active draft with the job its content was last tailored to.
pub fn set_last_applied_job(store: &mut DraftStore, job_id: &str) {
    let Some(id) = store.active_id().map(str::to_string) else {
        return;
    };
    store.update_record(&id, |mut record| {
        record.last_applied_job_id = Some(job_id.to_string());
        record
    });
}

/// Replaces the active draft's summary. Returns false without an active draft.
pub fn apply_summary(store: &mut DraftStore, summary: &str) -> bool {
    let Some(id) = store.active_id().map(str::to_string) else {
        return false;
    };
    store.update_content(&id, |mut content| {
        content.summary = Some(summary.to_string());
        content
    })
}

/// Applies a whole generation payload to the active draft in one write:
/// summary, then ordered skills, then experience, then the job stamp.
pub fn apply_generated_content(
    store: &mut DraftStore,
    generated: &GeneratedContent,
    job_id: Option<&str>,
) -> bool {
    let Some(id) = store.active_id().map(str::to_string) else {
        return false;
    };
    info!("Applying generated content to draft {id} (job: {job_id:?})");
    store.update_record(&id, |mut record| {
        let content = &mut record.content;
        if let Some(summary) = generated.summary.as_ref() {
            content.summary = Some(summary.clone());
        }
        if let Some(skills) = generated.skills.as_deref() {
            content.skills = Some(merge_ordered_skills(content.skills_slice(), skills));
        }
        if let Some(entries) = generated.experience.as_deref() {
            let mut experience = content.experience.take().unwrap_or_default();
            merge_experience(&mut experience, entries);
            content.experience = Some(experience);
        }
        if let Some(job_id) = job_id {
            record.last_applied_job_id = Some(job_id.to_string());
        }
        record
    })
}
