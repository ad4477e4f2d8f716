use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::collision::Intensity;

/// Which audience a domain is exposed to: `GET /domains/basic` vs `/domains/premium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTier {
    Basic,
    Premium,
}

impl DomainTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainTier::Basic => "basic",
            DomainTier::Premium => "premium",
        }
    }
}

impl std::str::FromStr for DomainTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(DomainTier::Basic),
            "premium" => Ok(DomainTier::Premium),
            other => Err(format!("unknown domain tier '{other}'")),
        }
    }
}

/// A curated foreign domain the engine can collide a user's interests against.
/// Names are unique within the catalog; the catalog is append-only from the
/// engine's view — mutations go through seed migration, never this process.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Domain {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub examples: Vec<String>,
    /// Stored as text[] in Postgres; parsed into an intensity set on load.
    pub intensities: Vec<String>,
    pub tier: String,
}

impl Domain {
    pub fn admits(&self, intensity: Intensity) -> bool {
        self.intensities.iter().any(|i| i == intensity.as_str())
    }

    pub fn domain_tier(&self) -> DomainTier {
        self.tier.parse().unwrap_or(DomainTier::Basic)
    }

    /// The sentinel domain emitted when the candidate set is empty (spec 4.C.7).
    pub fn sentinel() -> Self {
        Domain {
            id: Uuid::nil(),
            name: "Innovation".to_string(),
            category: "General".to_string(),
            description: "General innovative thinking".to_string(),
            keywords: Vec::new(),
            examples: Vec::new(),
            intensities: vec![
                "gentle".to_string(),
                "moderate".to_string(),
                "radical".to_string(),
            ],
            tier: "basic".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(intensities: &[&str]) -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: "Biomimicry".to_string(),
            category: "Science".to_string(),
            description: "Nature-inspired design".to_string(),
            keywords: vec!["evolution".to_string()],
            examples: vec![],
            intensities: intensities.iter().map(|s| s.to_string()).collect(),
            tier: "basic".to_string(),
        }
    }

    #[test]
    fn test_admits_checks_membership() {
        let d = domain(&["gentle", "moderate"]);
        assert!(d.admits(Intensity::Gentle));
        assert!(!d.admits(Intensity::Radical));
    }

    #[test]
    fn test_sentinel_admits_all_intensities() {
        let s = Domain::sentinel();
        assert!(s.admits(Intensity::Gentle));
        assert!(s.admits(Intensity::Moderate));
        assert!(s.admits(Intensity::Radical));
        assert_eq!(s.name, "Innovation");
    }

    #[test]
    fn test_domain_tier_defaults_to_basic_on_garbage() {
        let mut d = domain(&["gentle"]);
        d.tier = "unknown".to_string();
        assert_eq!(d.domain_tier(), DomainTier::Basic);
    }
}
