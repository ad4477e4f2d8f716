use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated caller of a generation request. Tier is read-only
/// from the engine's perspective — it is looked up once at the auth boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Pro,
    Team,
}

impl Tier {
    pub fn is_premium(&self) -> bool {
        matches!(self, Tier::Pro | Tier::Team)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Team => "team",
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "team" => Ok(Tier::Team),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub tier: Tier,
}
