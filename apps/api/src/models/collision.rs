use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The requested degree of conceptual distance between the user's domain and
/// the collision domain. Parameterizes both selection (4.B composite weights,
/// 4.C pool size) and enrichment (the 5th next-step for radical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Gentle,
    Moderate,
    Radical,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Gentle => "gentle",
            Intensity::Moderate => "moderate",
            Intensity::Radical => "radical",
        }
    }

    /// Composite weights (w_R, w_N) from spec 4.B.
    pub fn composite_weights(&self) -> (f64, f64) {
        match self {
            Intensity::Gentle => (0.6, 0.4),
            Intensity::Moderate => (0.4, 0.6),
            Intensity::Radical => (0.2, 0.8),
        }
    }

    /// Selector top-K pool size from spec 4.C.4.
    pub fn pool_size(&self) -> usize {
        match self {
            Intensity::Gentle => 3,
            Intensity::Moderate => 5,
            Intensity::Radical => 8,
        }
    }
}

impl std::str::FromStr for Intensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gentle" => Ok(Intensity::Gentle),
            "moderate" => Ok(Intensity::Moderate),
            "radical" => Ok(Intensity::Radical),
            other => Err(format!("unknown intensity '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Product,
    Content,
    Business,
    Research,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Product => "product",
            ProjectType::Content => "content",
            ProjectType::Business => "business",
            ProjectType::Research => "research",
        }
    }

    /// Category-affinity keyword sets from spec 4.B.2.
    pub fn affinity_categories(&self) -> &'static [&'static str] {
        match self {
            ProjectType::Product => &["design", "technology", "science", "crafts"],
            ProjectType::Content => &["arts", "media", "cultural", "entertainment"],
            ProjectType::Business => &["social systems", "economics", "human systems"],
            ProjectType::Research => &["science", "mathematics", "philosophy"],
        }
    }
}

/// The request body for `POST /collisions/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionRequest {
    pub interests: Vec<String>,
    pub project: String,
    pub project_type: ProjectType,
    pub intensity: Intensity,
}

impl CollisionRequest {
    /// Field/enumeration/non-empty-interests validation (pipeline step 2).
    pub fn validate(&self) -> Result<(), String> {
        if self.interests.is_empty() {
            return Err("interests must be a non-empty list".to_string());
        }
        if self.interests.iter().any(|i| i.trim().is_empty()) {
            return Err("interests must not contain blank entries".to_string());
        }
        if self.project.trim().is_empty() {
            return Err("project must not be empty".to_string());
        }
        Ok(())
    }
}

/// An idea collision: an unexpected pairing of the user's domain with a
/// curated foreign domain, annotated with rationale and next steps.
/// Immutable post-creation except for user-applied rating/notes, which
/// live on the owning `Session`, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionResult {
    pub id: Uuid,
    pub primary_domain: String,
    pub collision_domain: String,
    pub connection: String,
    pub spark_questions: Vec<String>,
    pub examples: Vec<String>,
    pub next_steps: Vec<String>,
    pub quality_score: f64,
    pub generated_at: DateTime<Utc>,
}
