//! Pure scoring functions over `(request, domain)`. No I/O, no randomness
//! except the bounded additive noise in `quality`, which callers can pin by
//! supplying a fixed `noise` value in tests.

use sha2::{Digest, Sha256};

use crate::models::collision::{Intensity, ProjectType};
use crate::models::domain::{Domain, DomainTier};

const NOVELTY_KEYWORDS: &[&str] = &["quantum", "chaos", "mythology", "ancient", "radical"];
const COMPLEXITY_VOCABULARY: &[&str] = &[
    "system",
    "platform",
    "algorithm",
    "network",
    "framework",
    "architecture",
    "optimization",
    "intelligence",
    "automation",
    "integration",
    "scalable",
    "distributed",
    "analytics",
];

/// Interest relevance `R_i`, normalized to `[0,1]`.
pub fn interest_relevance(interests: &[String], domain: &Domain) -> f64 {
    if interests.is_empty() {
        return 0.0;
    }

    let name_lc = domain.name.to_lowercase();
    let category_lc = domain.category.to_lowercase();
    let description_lc = domain.description.to_lowercase();
    let keywords_lc: Vec<String> = domain.keywords.iter().map(|k| k.to_lowercase()).collect();

    let total: f64 = interests
        .iter()
        .map(|interest| {
            let x = interest.trim().to_lowercase();
            if x.is_empty() {
                return 0.0;
            }
            let mut score = 0.0f64;
            if name_lc.contains(&x) {
                score += 3.0;
            }
            if category_lc.contains(&x) {
                score += 2.0;
            }
            for kw in &keywords_lc {
                if kw.contains(&x) || x.contains(kw.as_str()) {
                    score += 1.0;
                }
            }
            if description_lc.contains(&x) {
                score += 0.5;
            }
            score.min(3.0)
        })
        .sum();

    (total / (3.0 * interests.len() as f64)).clamp(0.0, 1.0)
}

/// Project relevance `R_p`, clamped to `[0,1]`.
pub fn project_relevance(project_type: ProjectType, project: &str, domain: &Domain) -> f64 {
    let project_lc = project.to_lowercase();
    let category_lc = domain.category.to_lowercase();

    let mut score = 0.0f64;

    if project_type
        .affinity_categories()
        .iter()
        .any(|affinity| category_lc.contains(affinity))
    {
        score += 0.3;
    }

    for keyword in &domain.keywords {
        if project_lc.contains(&keyword.to_lowercase()) {
            score += 0.2;
        }
    }

    let project_words: Vec<&str> = project_lc
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .collect();
    for example in &domain.examples {
        let example_lc = example.to_lowercase();
        let shares_word = example_lc
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .any(|w| project_words.contains(&w));
        if shares_word {
            score += 0.1;
        }
    }

    score.clamp(0.0, 1.0)
}

/// Novelty `N`, derived from `R_i`; boosted for thematically "novel" domains.
pub fn novelty(r_i: f64, domain: &Domain) -> f64 {
    let base = (1.0 - r_i).max(0.2);
    let haystack = format!(
        "{} {} {}",
        domain.category.to_lowercase(),
        domain.name.to_lowercase(),
        domain.description.to_lowercase()
    );
    if NOVELTY_KEYWORDS.iter().any(|kw| haystack.contains(kw)) {
        (base * 1.2).min(1.0)
    } else {
        base
    }
}

fn project_complexity(project: &str) -> f64 {
    let project_lc = project.to_lowercase();
    let hits = COMPLEXITY_VOCABULARY
        .iter()
        .filter(|word| project_lc.contains(*word))
        .count();
    (hits as f64 / 5.0).min(1.0)
}

fn domain_depth(domain: &Domain) -> f64 {
    let keyword_term = (domain.keywords.len() as f64 / 10.0).min(0.3);
    let example_term = (domain.examples.len() as f64 / 5.0).min(0.3);
    let description_term = (domain.description.len() as f64 / 200.0).min(0.2);
    let tier_term = if domain.domain_tier() == DomainTier::Premium {
        0.2
    } else {
        0.0
    };
    (keyword_term + example_term + description_term + tier_term).min(1.0)
}

/// Quality score `Q`, in `[0,100]`. `noise` is the additive term in
/// `[-2.5, 2.5]`; production callers draw it from `rand`, tests pin it.
pub fn quality(r_p: f64, n: f64, project: &str, domain: &Domain, noise: f64) -> f64 {
    let complexity = project_complexity(project);
    let depth = domain_depth(domain);
    let base = 0.30 * r_p + 0.30 * n + 0.20 * complexity + 0.20 * depth;
    (base * 100.0 + noise).clamp(0.0, 100.0)
}

/// Composite score used for ranking candidates, parameterized by intensity.
pub fn composite(intensity: Intensity, r_p: f64, n: f64) -> f64 {
    let (w_r, w_n) = intensity.composite_weights();
    w_r * r_p + w_n * n
}

/// Deterministic 16-character lowercase hex fingerprint of a request's
/// interests and a domain name — the first 8 bytes of a SHA-256 digest over
/// the lowercased, sorted, newline-joined interests concatenated with the
/// lowercased domain name. Reserved for future `collision:result:{hash}`
/// memoization; not read or written on the hot path today.
pub fn generate_connection_hash(interests: &[String], domain_name: &str) -> String {
    let mut lowered: Vec<String> = interests.iter().map(|i| i.trim().to_lowercase()).collect();
    lowered.sort();
    let joined = lowered.join("\n");
    let input = format!("{joined}{}", domain_name.to_lowercase());

    let digest = Sha256::digest(input.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
