//! Skill Merge Engine — reconciles an externally ranked skill list with the
//! skills a draft already has.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::drafts::store::DraftStore;

/// Merges `ordered` into `existing`.
///
/// 1. Each incoming skill resolves to the stored casing on a case-insensitive
///    hit, else keeps its own casing.
/// 2. Resolved skills are emitted in incoming order, first occurrence wins.
/// 3. Existing skills the incoming list did not mention follow, in their
///    original relative order.
pub fn merge_ordered_skills(existing: &[String], ordered: &[String]) -> Vec<String> {
    let mut stored: HashMap<String, &str> = HashMap::with_capacity(existing.len());
    for skill in existing {
        stored.entry(skill.to_lowercase()).or_insert(skill.as_str());
    }

    let mut result: Vec<String> = Vec::with_capacity(existing.len() + ordered.len());
    let mut seen: HashSet<String> = HashSet::new();

    for incoming in ordered {
        let incoming = incoming.trim();
        if incoming.is_empty() {
            continue;
        }
        let key = incoming.to_lowercase();
        let resolved = stored.get(&key).copied().unwrap_or(incoming);
        if seen.insert(key) {
            result.push(resolved.to_string());
        }
    }

    for skill in existing {
        if seen.insert(skill.to_lowercase()) {
            result.push(skill.clone());
        }
    }

    result
}

/// Drops later case-insensitive repeats, keeping the first spelling.
pub fn dedupe_skills_case_insensitive(skills: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .cloned()
        .collect()
}

/// Applies an ordered skill list to the active draft.
/// Returns false when there is no active draft.
pub fn apply_ordered_skills(store: &mut DraftStore, ordered: &[String]) -> bool {
    let Some(id) = store.active_id().map(str::to_string) else {
        return false;
    };
    debug!("Applying {} ordered skills to draft {id}", ordered.len());
    store.update_content(&id, |mut content| {
        content.skills = Some(merge_ordered_skills(content.skills_slice(), ordered));
        content
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::store::tests::{memory_store, named};
    use crate::models::draft::DraftContent;

    fn s(items: &[&str]) -> Vec<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_existing_casing_wins() {
        let merged = merge_ordered_skills(&s(&["JavaScript"]), &s(&["javascript", "Python"]));
        assert_eq!(merged, s(&["JavaScript", "Python"]));
    }

    #[test]
    fn test_incoming_order_then_leftovers() {
        let merged = merge_ordered_skills(
            &s(&["Docker", "Go", "Kubernetes"]),
            &s(&["kubernetes", "Terraform"]),
        );
        assert_eq!(merged, s(&["Kubernetes", "Terraform", "Docker", "Go"]));
    }

    #[test]
    fn test_empty_incoming_keeps_existing() {
        assert_eq!(merge_ordered_skills(&s(&["A", "B"]), &[]), s(&["A", "B"]));
    }

    #[test]
    fn test_both_empty() {
        assert!(merge_ordered_skills(&[], &[]).is_empty());
    }

    #[test]
    fn test_incoming_repeats_collapse() {
        let merged = merge_ordered_skills(&[], &s(&["Python", "python", "Python"]));
        assert_eq!(merged, s(&["Python"]));
    }

    #[test]
    fn test_blank_incoming_skipped() {
        let merged = merge_ordered_skills(&s(&["SQL"]), &s(&["  ", "Rust"]));
        assert_eq!(merged, s(&["Rust", "SQL"]));
    }

    #[test]
    fn test_idempotent() {
        let existing = s(&["SQL", "Excel", "go"]);
        let ordered = s(&["Go", "Python", "sql"]);
        let once = merge_ordered_skills(&existing, &ordered);
        let twice = merge_ordered_skills(&once, &ordered);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dedupe_keeps_first_spelling() {
        assert_eq!(
            dedupe_skills_case_insensitive(&s(&["AWS", "aws", "GCP", "Aws"])),
            s(&["AWS", "GCP"])
        );
    }

    #[test]
    fn test_apply_to_active_draft() {
        let mut store = memory_store();
        let id = named(
            &mut store,
            "D",
            DraftContent {
                skills: Some(s(&["SQL"])),
                ..Default::default()
            },
        );
        assert!(apply_ordered_skills(&mut store, &s(&["Python", "sql"])));
        assert_eq!(
            store.get(&id).unwrap().content.skills,
            Some(s(&["Python", "SQL"]))
        );
    }

    #[test]
    fn test_apply_without_active_is_noop() {
        let mut store = memory_store();
        assert!(!apply_ordered_skills(&mut store, &s(&["Rust"])));
    }
}
