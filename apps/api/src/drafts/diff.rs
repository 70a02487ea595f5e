//! Diff Engine — read-only structural comparison of two drafts.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::drafts::experience::{contains_bullet, entry_matches};
use crate::drafts::store::DraftStore;
use crate::models::draft::{DraftContent, ExperienceEntry};

/// Bullet-level changes for a role present in both drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceChange {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub added_bullets: Vec<String>,
    pub removed_bullets: Vec<String>,
}

/// What changes when going from draft A to draft B.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDiff {
    pub summary_changed: bool,
    pub skills_added: Vec<String>,
    pub skills_removed: Vec<String>,
    pub experience_added: Vec<ExperienceEntry>,
    pub experience_removed: Vec<ExperienceEntry>,
    pub experience_modified: Vec<ExperienceChange>,
}

impl DraftDiff {
    pub fn is_empty(&self) -> bool {
        *self == DraftDiff::default()
    }
}

/// Skills in `to` that `from` lacks, exact string membership, `to` order.
fn missing_skills(from: &[String], to: &[String]) -> Vec<String> {
    let present: HashSet<&str> = from.iter().map(String::as_str).collect();
    to.iter()
        .filter(|s| !present.contains(s.as_str()))
        .cloned()
        .collect()
}

fn unmatched(from: &[ExperienceEntry], to: &[ExperienceEntry]) -> Vec<ExperienceEntry> {
    to.iter()
        .filter(|target| !from.iter().any(|candidate| entry_matches(candidate, target)))
        .cloned()
        .collect()
}

fn missing_bullets(from: &[String], to: &[String]) -> Vec<String> {
    to.iter()
        .filter(|b| !contains_bullet(from, b))
        .cloned()
        .collect()
}

/// Compares two contents. Pure; neither side is touched.
pub fn diff_content(a: &DraftContent, b: &DraftContent) -> DraftDiff {
    let (a_skills, b_skills) = (a.skills_slice(), b.skills_slice());
    let (a_exp, b_exp) = (a.experience_slice(), b.experience_slice());

    let experience_modified = a_exp
        .iter()
        .filter_map(|before| {
            let after = b_exp.iter().find(|candidate| entry_matches(candidate, before))?;
            let added_bullets = missing_bullets(&before.bullets, &after.bullets);
            let removed_bullets = missing_bullets(&after.bullets, &before.bullets);
            if added_bullets.is_empty() && removed_bullets.is_empty() {
                return None;
            }
            Some(ExperienceChange {
                role: before.role.clone(),
                company: before.company.clone(),
                added_bullets,
                removed_bullets,
            })
        })
        .collect();

    DraftDiff {
        summary_changed: a.summary_str() != b.summary_str(),
        skills_added: missing_skills(a_skills, b_skills),
        skills_removed: missing_skills(b_skills, a_skills),
        experience_added: unmatched(a_exp, b_exp),
        experience_removed: unmatched(b_exp, a_exp),
        experience_modified,
    }
}

/// Diffs two stored drafts. `None` when either id is unknown.
pub fn diff(store: &DraftStore, a_id: &str, b_id: &str) -> Option<DraftDiff> {
    let a = store.get(a_id)?;
    let b = store.get(b_id)?;
    Some(diff_content(&a.content, &b.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::store::tests::{memory_store, named};

    fn skills(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|i| i.to_string()).collect())
    }

    fn role(role: &str, company: Option<&str>, bullets: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            role: role.into(),
            company: company.map(str::to_string),
            dates: None,
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_identical_content_is_empty() {
        let content = DraftContent {
            summary: Some("Hi".into()),
            skills: skills(&["Rust"]),
            experience: Some(vec![role("Engineer", None, &["X"])]),
        };
        assert!(diff_content(&content, &content.clone()).is_empty());
    }

    #[test]
    fn test_absent_summary_equals_empty() {
        let a = DraftContent::default();
        let b = DraftContent {
            summary: Some(String::new()),
            ..Default::default()
        };
        assert!(!diff_content(&a, &b).summary_changed);
    }

    #[test]
    fn test_summary_change_detected() {
        let a = DraftContent {
            summary: Some("Old".into()),
            ..Default::default()
        };
        assert!(diff_content(&a, &DraftContent::default()).summary_changed);
    }

    #[test]
    fn test_skills_compared_exactly() {
        let a = DraftContent {
            skills: skills(&["SQL", "Go"]),
            ..Default::default()
        };
        let b = DraftContent {
            skills: skills(&["sql", "Go", "Rust"]),
            ..Default::default()
        };
        let d = diff_content(&a, &b);
        assert_eq!(d.skills_added, vec!["sql", "Rust"]);
        assert_eq!(d.skills_removed, vec!["SQL"]);
    }

    #[test]
    fn test_skills_symmetry() {
        let a = DraftContent {
            skills: skills(&["A", "B", "C"]),
            ..Default::default()
        };
        let b = DraftContent {
            skills: skills(&["C", "D"]),
            ..Default::default()
        };
        assert_eq!(
            diff_content(&a, &b).skills_added,
            diff_content(&b, &a).skills_removed
        );
    }

    #[test]
    fn test_experience_added_removed_modified() {
        let a = DraftContent {
            experience: Some(vec![
                role("Engineer", Some("Acme"), &["Built X", "Fixed Z"]),
                role("Intern", Some("Globex"), &["Coffee"]),
            ]),
            ..Default::default()
        };
        let b = DraftContent {
            experience: Some(vec![
                role("engineer", Some("ACME"), &[" Built X", "Built Y"]),
                role("Manager", None, &["Hired 4"]),
            ]),
            ..Default::default()
        };
        let d = diff_content(&a, &b);
        assert_eq!(d.experience_added.len(), 1);
        assert_eq!(d.experience_added[0].role, "Manager");
        assert_eq!(d.experience_removed.len(), 1);
        assert_eq!(d.experience_removed[0].role, "Intern");
        assert_eq!(
            d.experience_modified,
            vec![ExperienceChange {
                role: "Engineer".into(),
                company: Some("Acme".into()),
                added_bullets: vec!["Built Y".into()],
                removed_bullets: vec!["Fixed Z".into()],
            }]
        );
    }

    #[test]
    fn test_company_only_on_one_side_is_directional() {
        // A's company-less entry matches B's by role, but B names a company
        // that A lacks, so B's entry also counts as added.
        let a = DraftContent {
            experience: Some(vec![role("Engineer", None, &["X"])]),
            ..Default::default()
        };
        let b = DraftContent {
            experience: Some(vec![role("Engineer", Some("Acme"), &["X", "Y"])]),
            ..Default::default()
        };
        let d = diff_content(&a, &b);
        assert_eq!(d.experience_modified.len(), 1);
        assert_eq!(d.experience_modified[0].added_bullets, vec!["Y"]);
        assert_eq!(d.experience_added.len(), 1);
        assert_eq!(d.experience_added[0].company.as_deref(), Some("Acme"));
        assert!(d.experience_removed.is_empty());

        let back = diff_content(&b, &a);
        assert!(back.experience_modified.is_empty());
        assert!(back.experience_added.is_empty());
        assert_eq!(back.experience_removed.len(), 1);
    }

    #[test]
    fn test_unchanged_role_not_reported() {
        let a = DraftContent {
            experience: Some(vec![role("Engineer", None, &["X"])]),
            ..Default::default()
        };
        let b = a.clone();
        assert!(diff_content(&a, &b).experience_modified.is_empty());
    }

    #[test]
    fn test_unknown_id_is_none() {
        let mut store = memory_store();
        let id = named(&mut store, "A", DraftContent::default());
        assert!(diff(&store, &id, "missing").is_none());
        assert!(diff(&store, "missing", &id).is_none());
        assert!(diff(&store, &id, &id).unwrap().is_empty());
    }

    #[test]
    fn test_diff_does_not_mutate() {
        let mut store = memory_store();
        let a = named(
            &mut store,
            "A",
            DraftContent {
                skills: skills(&["A"]),
                ..Default::default()
            },
        );
        let b = named(&mut store, "B", DraftContent::default());
        let before = store.records().to_vec();
        let first = diff(&store, &a, &b);
        let second = diff(&store, &a, &b);
        assert_eq!(first, second);
        assert_eq!(store.records(), before.as_slice());
    }
}
