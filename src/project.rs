//! Project entity
//!
//! A project is created once from a catalog template and then mutated only
//! through the contribution engine's atomic store update. Completion is a
//! derived property of the snapshot, never a stored state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::Template;

/// A shared construction project
///
/// `required` is fixed at creation (copied from the template); `contributed`
/// covers the same resource keys and each value only ever grows, bounded by
/// the corresponding requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub template_key: String,
    pub display_name: String,
    pub required: BTreeMap<String, u64>,
    pub contributed: BTreeMap<String, u64>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a project from a catalog template
    ///
    /// Requirements are copied (never aliased) and contributions start at
    /// zero for every required resource.
    pub fn from_template(id: String, template: &Template) -> Self {
        let required = template.required.clone();
        let contributed = required.keys().map(|k| (k.clone(), 0)).collect();
        Self {
            id,
            template_key: template.key.to_string(),
            display_name: template.display_name.to_string(),
            required,
            contributed,
            created_at: Utc::now(),
        }
    }

    /// Remaining capacity for a resource, or None if the resource is unknown
    pub fn remaining(&self, resource: &str) -> Option<u64> {
        let required = *self.required.get(resource)?;
        let contributed = self.contributed.get(resource).copied().unwrap_or(0);
        Some(required.saturating_sub(contributed))
    }

    /// Whether every requirement has been fully contributed
    pub fn is_complete(&self) -> bool {
        self.required
            .iter()
            .all(|(resource, required)| {
                self.contributed.get(resource).copied().unwrap_or(0) >= *required
            })
    }

    /// Total units contributed across all resources
    ///
    /// Contributions only ever grow, so this sum is a monotone progress
    /// counter: snapshot X includes snapshot Y's updates iff
    /// `X.total_contributed() >= Y.total_contributed()`.
    pub fn total_contributed(&self) -> u64 {
        self.contributed.values().sum()
    }

    /// Whether the project was created before the given cutoff
    pub fn older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.created_at < cutoff
    }
}

/// Check a candidate project id: non-empty, ASCII uppercase letters and
/// digits only. Generated ids (UUID v4) bypass this and are always valid.
pub fn is_valid_project_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRegistry;

    fn gold_project() -> Project {
        let template = Template::fixed("outpost", "Outpost", &[("Gold", 100)]);
        Project::from_template("TEST1".to_string(), &template)
    }

    #[test]
    fn test_from_template_zeroes_contributions() {
        let project = gold_project();
        assert_eq!(project.contributed.get("Gold"), Some(&0));
        assert_eq!(
            project.required.keys().collect::<Vec<_>>(),
            project.contributed.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_from_template_copies_requirements() {
        let catalog = CatalogRegistry::builtin();
        let template = catalog.get("coriolis_starport").unwrap();
        let project = Project::from_template("A1".to_string(), template);
        assert_eq!(project.required.get("Aluminium"), Some(&2_500_000));
        assert_eq!(project.display_name, "Coriolis Starport");
        assert_eq!(project.template_key, "coriolis_starport");
    }

    #[test]
    fn test_remaining() {
        let mut project = gold_project();
        assert_eq!(project.remaining("Gold"), Some(100));
        project.contributed.insert("Gold".to_string(), 40);
        assert_eq!(project.remaining("Gold"), Some(60));
        assert_eq!(project.remaining("Platinum"), None);
    }

    #[test]
    fn test_total_contributed_tracks_progress() {
        let mut project = gold_project();
        assert_eq!(project.total_contributed(), 0);
        project.contributed.insert("Gold".to_string(), 40);
        assert_eq!(project.total_contributed(), 40);
    }

    #[test]
    fn test_is_complete_is_pure() {
        let mut project = gold_project();
        assert!(!project.is_complete());
        assert!(!project.is_complete());

        project.contributed.insert("Gold".to_string(), 100);
        assert!(project.is_complete());
        assert!(project.is_complete());
    }

    #[test]
    fn test_project_id_charset() {
        assert!(is_valid_project_id("PROJECT1"));
        assert!(is_valid_project_id("A"));
        assert!(!is_valid_project_id(""));
        assert!(!is_valid_project_id("project1"));
        assert!(!is_valid_project_id("HAS SPACE"));
        assert!(!is_valid_project_id("DASH-1"));
    }

    #[test]
    fn test_wire_roundtrip_preserves_large_quantities() {
        let catalog = CatalogRegistry::builtin();
        let template = catalog.get("coriolis_starport").unwrap();
        let project = Project::from_template("BIG1".to_string(), template);

        let json = serde_json::to_string(&project).unwrap();
        assert!(json.contains("\"templateKey\":\"coriolis_starport\""));
        assert!(json.contains("\"createdAt\""));

        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back.required.get("Aluminium"), Some(&2_500_000));
        assert_eq!(back.created_at, project.created_at);
    }
}
