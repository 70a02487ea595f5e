//! Experience Merge Engine — upserts role blocks keyed by (role, company).

use tracing::debug;

use crate::drafts::store::DraftStore;
use crate::models::draft::ExperienceEntry;

/// Role given to incoming entries that arrive without one.
pub const PLACEHOLDER_ROLE: &str = "Untitled Role";

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Identity rule shared by merge and diff: roles must match
/// case-insensitively, and companies too when `target` names one.
pub fn entry_matches(candidate: &ExperienceEntry, target: &ExperienceEntry) -> bool {
    if normalize(&candidate.role) != normalize(&target.role) {
        return false;
    }
    match target.company.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(company) => candidate
            .company
            .as_deref()
            .is_some_and(|c| normalize(c) == normalize(company)),
        None => true,
    }
}

/// True when `bullets` already holds `bullet` after trimming both sides.
pub fn contains_bullet(bullets: &[String], bullet: &str) -> bool {
    let bullet = bullet.trim();
    bullets.iter().any(|b| b.trim() == bullet)
}

/// Appends each incoming bullet not already present (trimmed, case-sensitive).
/// Returns how many were added.
pub fn merge_bullets(target: &mut Vec<String>, incoming: &[String]) -> usize {
    let before = target.len();
    for bullet in incoming {
        if !contains_bullet(target, bullet) {
            target.push(bullet.clone());
        }
    }
    target.len() - before
}

fn with_role(entry: &ExperienceEntry) -> ExperienceEntry {
    let mut entry = entry.clone();
    if entry.role.trim().is_empty() {
        entry.role = PLACEHOLDER_ROLE.to_string();
    }
    entry
}

/// Folds `incoming` into `existing`, one entry at a time in input order.
///
/// A matching entry gains the new bullets and, only when its own `dates` is
/// empty, the incoming dates. Unmatched entries are appended as-is, so later
/// incoming entries may match ones added earlier in the same call.
pub fn merge_experience(existing: &mut Vec<ExperienceEntry>, incoming: &[ExperienceEntry]) {
    for entry in incoming {
        let entry = with_role(entry);
        match existing.iter_mut().find(|e| entry_matches(e, &entry)) {
            Some(target) => {
                merge_bullets(&mut target.bullets, &entry.bullets);
                if !has_text(target.dates.as_deref()) && has_text(entry.dates.as_deref()) {
                    target.dates = entry.dates.clone();
                }
            }
            None => existing.push(entry),
        }
    }
}

/// Applies AI-provided role entries to the active draft.
/// Returns false when there is no active draft.
pub fn append_experience_from_ai(store: &mut DraftStore, entries: &[ExperienceEntry]) -> bool {
    let Some(id) = store.active_id().map(str::to_string) else {
        return false;
    };
    debug!("Merging {} experience entries into draft {id}", entries.len());
    store.update_content(&id, |mut content| {
        let mut experience = content.experience.take().unwrap_or_default();
        merge_experience(&mut experience, entries);
        content.experience = Some(experience);
        content
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::store::tests::{memory_store, named};
    use crate::models::draft::DraftContent;

    fn entry(role: &str, company: Option<&str>, dates: Option<&str>, bullets: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            role: role.to_string(),
            company: company.map(str::to_string),
            dates: dates.map(str::to_string),
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_bullets_deduplicated() {
        let mut existing = vec![entry("Lead", Some("Acme"), None, &["Led team of 5"])];
        merge_experience(
            &mut existing,
            &[entry("Lead", Some("Acme"), None, &["Led team of 5", "Shipped v2"])],
        );
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].bullets, vec!["Led team of 5", "Shipped v2"]);
    }

    #[test]
    fn test_bullet_compare_trims_but_keeps_case() {
        let mut bullets = vec!["Built X".to_string()];
        let added = merge_bullets(
            &mut bullets,
            &["  Built X ".to_string(), "built x".to_string()],
        );
        assert_eq!(added, 1);
        assert_eq!(bullets, vec!["Built X", "built x"]);
    }

    #[test]
    fn test_dates_never_overwritten() {
        let mut existing = vec![entry("Engineer", None, Some("2020-2022"), &[])];
        merge_experience(&mut existing, &[entry("engineer", None, Some("2021-2023"), &[])]);
        assert_eq!(existing[0].dates.as_deref(), Some("2020-2022"));
    }

    #[test]
    fn test_dates_backfilled_when_empty() {
        let mut existing = vec![entry("Engineer", None, Some(" "), &[])];
        merge_experience(&mut existing, &[entry("Engineer", None, Some("2021-2023"), &[])]);
        assert_eq!(existing[0].dates.as_deref(), Some("2021-2023"));
    }

    #[test]
    fn test_company_distinguishes_roles() {
        let mut existing = vec![entry("Engineer", Some("Acme"), None, &["A"])];
        merge_experience(&mut existing, &[entry("Engineer", Some("Globex"), None, &["B"])]);
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn test_missing_company_matches_role_only() {
        let mut existing = vec![entry("Engineer", Some("Acme"), None, &["A"])];
        merge_experience(&mut existing, &[entry("ENGINEER", None, None, &["B"])]);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].bullets, vec!["A", "B"]);
    }

    #[test]
    fn test_incoming_company_requires_existing_company() {
        let mut existing = vec![entry("Engineer", None, None, &["A"])];
        merge_experience(&mut existing, &[entry("Engineer", Some("Acme"), None, &["B"])]);
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn test_later_entries_match_earlier_additions() {
        let mut existing = Vec::new();
        merge_experience(
            &mut existing,
            &[
                entry("Analyst", Some("Initech"), None, &["Wrote TPS reports"]),
                entry("analyst", Some("initech"), Some("2019"), &["Automated TPS reports"]),
            ],
        );
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].bullets.len(), 2);
        assert_eq!(existing[0].dates.as_deref(), Some("2019"));
    }

    #[test]
    fn test_empty_role_gets_placeholder() {
        let mut existing = Vec::new();
        merge_experience(&mut existing, &[entry("", None, None, &["Did things"])]);
        merge_experience(&mut existing, &[entry("  ", None, None, &["Did things"])]);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].role, PLACEHOLDER_ROLE);
    }

    #[test]
    fn test_repeat_application_is_stable() {
        let incoming = vec![entry("Engineer", Some("Acme"), Some("2021"), &["Built X", "Built Y"])];
        let mut once = vec![entry("Engineer", Some("Acme"), None, &["Built X"])];
        merge_experience(&mut once, &incoming);
        let mut twice = once.clone();
        merge_experience(&mut twice, &incoming);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_to_active_draft() {
        let mut store = memory_store();
        let id = named(
            &mut store,
            "D",
            DraftContent {
                experience: Some(vec![entry("Engineer", Some("Acme"), None, &["Built X"])]),
                ..Default::default()
            },
        );
        assert!(append_experience_from_ai(
            &mut store,
            &[entry("Engineer", Some("Acme"), None, &["Built X", "Built Y"])]
        ));
        let experience = store.get(&id).unwrap().content.experience_slice().to_vec();
        assert_eq!(experience.len(), 1);
        assert_eq!(experience[0].bullets, vec!["Built X", "Built Y"]);
    }

    #[test]
    fn test_apply_without_active_is_noop() {
        let mut store = memory_store();
        assert!(!append_experience_from_ai(&mut store, &[entry("Engineer", None, None, &[])]));
    }
}
