//! The Selector: picks a primary domain from the user's interests, builds a
//! ranked candidate pool under the anti-echo-chamber intensity weighting, and
//! draws one winner via weighted-random tie-break so the same request does
//! not always collide against the same domain.

use rand::distributions::{Distribution, WeightedIndex};

use super::scorer;
use crate::engine::catalog::CatalogSnapshot;
use crate::models::collision::CollisionRequest;
use crate::models::domain::Domain;

/// Everything the engine needs to build a `CollisionResult`, before
/// enrichment fills in the text fields.
pub struct Selection {
    pub primary_domain: String,
    pub collision_domain: Domain,
    pub novelty: f64,
    pub project_relevance: f64,
    pub connection: String,
}

/// Runs domain selection for one request against a catalog snapshot.
/// `noise` is the quality-score jitter — callers pass `rand`-drawn noise in
/// production and a fixed value in tests.
pub fn select(snapshot: &CatalogSnapshot, request: &CollisionRequest) -> Selection {
    let primary_domain = choose_primary(snapshot, &request.interests);

    let mut candidates: Vec<(&Domain, f64, f64, f64)> = snapshot
        .all()
        .iter()
        .filter(|d| d.admits(request.intensity) && d.name != primary_domain)
        .map(|d| {
            let r_p = scorer::project_relevance(request.project_type, &request.project, d);
            let r_i = scorer::interest_relevance(&request.interests, d);
            let n = scorer::novelty(r_i, d);
            let s = scorer::composite(request.intensity, r_p, n);
            (d, r_p, n, s)
        })
        .collect();

    candidates.sort_by(|a, b| b.3.total_cmp(&a.3));
    candidates.truncate(request.intensity.pool_size());

    if candidates.is_empty() {
        let sentinel = Domain::sentinel();
        let connection = format!(
            "Drawing general innovative thinking into {} opens space for new approaches.",
            request.project
        );
        return Selection {
            primary_domain,
            collision_domain: sentinel,
            novelty: 0.5,
            project_relevance: 0.0,
            connection,
        };
    }

    let weights: Vec<f64> = (0..candidates.len())
        .map(|i| (-0.5 * i as f64).exp())
        .collect();
    let dist = WeightedIndex::new(&weights).expect("non-empty positive weights");
    let winner_idx = dist.sample(&mut rand::thread_rng());
    let (domain, r_p, n, _score) = &candidates[winner_idx];

    let connection = connection_rationale(domain, &request.project, *n, *r_p);

    Selection {
        primary_domain,
        collision_domain: (*domain).clone(),
        novelty: *n,
        project_relevance: *r_p,
        connection,
    }
}

fn choose_primary(snapshot: &CatalogSnapshot, interests: &[String]) -> String {
    if interests.is_empty() {
        return "General Innovation".to_string();
    }

    let best = snapshot
        .all()
        .iter()
        .map(|d| (d, scorer::interest_relevance(interests, d)))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((domain, score)) if score > 0.0 => domain.name.clone(),
        _ => capitalize(&interests[0]),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn connection_rationale(domain: &Domain, project: &str, novelty: f64, r_p: f64) -> String {
    let category_lc = domain.category.to_lowercase();
    if novelty > 0.7 {
        format!(
            "Exploring {} offers an unexpected lens for {project}, challenging conventional approaches through {category_lc} principles.",
            domain.name
        )
    } else if r_p > 0.6 {
        format!(
            "The principles of {} can directly enhance {project} by applying {category_lc} methodologies.",
            domain.name
        )
    } else {
        format!(
            "Drawing from {} creates novel opportunities for {project} through cross-disciplinary insight.",
            domain.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collision::{Intensity, ProjectType};
    use uuid::Uuid;

    fn domain(name: &str, intensities: &[&str]) -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: "Science".to_string(),
            description: "desc".to_string(),
            keywords: vec![],
            examples: vec![],
            intensities: intensities.iter().map(|s| s.to_string()).collect(),
            tier: "basic".to_string(),
        }
    }

    fn request(interests: &[&str], intensity: Intensity) -> CollisionRequest {
        CollisionRequest {
            interests: interests.iter().map(|s| s.to_string()).collect(),
            project: "AI recommendation system".to_string(),
            project_type: ProjectType::Product,
            intensity,
        }
    }

    #[test]
    fn test_collision_domain_never_equals_primary() {
        let snapshot = CatalogSnapshot::new(vec![
            domain("Biomimicry", &["gentle", "moderate"]),
            domain("Quantum Physics", &["gentle", "moderate", "radical"]),
        ]);
        let req = request(&["biomimicry"], Intensity::Gentle);
        let sel = select(&snapshot, &req);
        assert_ne!(sel.primary_domain, sel.collision_domain.name);
    }

    #[test]
    fn test_intensity_filters_inadmissible_domains() {
        let snapshot = CatalogSnapshot::new(vec![
            domain("Biomimicry", &["gentle", "moderate"]),
            domain("Quantum Physics", &["radical"]),
        ]);
        let req = request(&["biology", "evolution"], Intensity::Radical);
        let sel = select(&snapshot, &req);
        assert_eq!(sel.collision_domain.name, "Quantum Physics");
    }

    #[test]
    fn test_empty_catalog_yields_sentinel() {
        let snapshot = CatalogSnapshot::empty();
        let req = request(&["biology"], Intensity::Moderate);
        let sel = select(&snapshot, &req);
        assert_eq!(sel.collision_domain.name, "Innovation");
    }

    #[test]
    fn test_empty_interests_yields_general_innovation_primary() {
        let snapshot = CatalogSnapshot::new(vec![domain("Biomimicry", &["gentle"])]);
        let req = request(&[], Intensity::Gentle);
        let sel = select(&snapshot, &req);
        assert_eq!(sel.primary_domain, "General Innovation");
    }

    #[test]
    fn test_no_admissible_candidates_yields_sentinel() {
        let snapshot = CatalogSnapshot::new(vec![domain("Biomimicry", &["gentle"])]);
        let req = request(&["x"], Intensity::Radical);
        let sel = select(&snapshot, &req);
        assert_eq!(sel.collision_domain.name, "Innovation");
    }
}
