use serde::{Deserialize, Serialize};

use crate::models::{Profile, Role};

/// Points available for genre overlap
pub const GENRE_WEIGHT: f64 = 40.0;
/// Points for a complementary role
pub const ROLE_WEIGHT: f64 = 30.0;
pub const VERIFIED_BONUS: f64 = 15.0;
pub const HIGHLIGHT_BONUS: f64 = 10.0;
pub const RATING_BONUS: f64 = 5.0;
/// Ratings strictly above this earn the rating bonus
pub const RATING_THRESHOLD: f64 = 4.0;

/// Per-term view of a compatibility score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub genre: f64,
    pub role: f64,
    pub activity: f64,
    pub total: f64,
}

/// Roles that pair well with `role`
pub fn complements(role: Role) -> &'static [Role] {
    use Role::*;
    match role {
        Producer => &[Vocalist, Songwriter, Instrumentalist],
        Vocalist => &[Producer, Songwriter, Instrumentalist],
        Songwriter => &[Producer, Vocalist, Instrumentalist],
        Instrumentalist => &[Producer, Vocalist, Songwriter],
        Mixer => &[Producer, Vocalist, Instrumentalist],
        AandR => &[Producer, Vocalist, Songwriter],
    }
}

/// Compatibility score (0-100) of `candidate` as seen by `viewer`
///
/// Scoring formula:
/// score = (
///     genre_overlap * 40 +     # shared / max(|viewer|, |candidate|)
///     role_match * 30 +        # candidate role complements viewer role
///     verified * 15 +
///     has_highlights * 10 +
///     rating_above_4 * 5
/// )
pub fn score(viewer: &Profile, candidate: &Profile) -> f64 {
    score_breakdown(viewer, candidate).total
}

pub fn score_breakdown(viewer: &Profile, candidate: &Profile) -> ScoreBreakdown {
    let genre = genre_score(viewer, candidate);
    let role = role_score(viewer.role, candidate.role);
    let activity = activity_score(candidate);

    ScoreBreakdown {
        genre,
        role,
        activity,
        total: (genre + role + activity).clamp(0.0, 100.0),
    }
}

#[inline]
fn genre_score(viewer: &Profile, candidate: &Profile) -> f64 {
    let denominator = viewer.genres.len().max(candidate.genres.len());
    if viewer.genres.is_empty() || candidate.genres.is_empty() {
        return 0.0;
    }

    let shared = viewer.genres.intersection(&candidate.genres).count();
    (shared as f64 / denominator as f64) * GENRE_WEIGHT
}

#[inline]
fn role_score(viewer_role: Role, candidate_role: Role) -> f64 {
    if complements(viewer_role).contains(&candidate_role) {
        ROLE_WEIGHT
    } else {
        0.0
    }
}

#[inline]
fn activity_score(candidate: &Profile) -> f64 {
    let mut score = 0.0;
    if candidate.verified {
        score += VERIFIED_BONUS;
    }
    if candidate.highlight_count > 0 {
        score += HIGHLIGHT_BONUS;
    }
    if candidate.rating > RATING_THRESHOLD {
        score += RATING_BONUS;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn create_test_profile(id: &str, role: Role, genres: &[&str]) -> Profile {
        Profile {
            id: id.to_string(),
            display_name: format!("User {}", id),
            role,
            genres: genres.iter().map(|g| g.to_string()).collect::<BTreeSet<_>>(),
            location: "Berlin".to_string(),
            bio: String::new(),
            verified: false,
            rating: 0.0,
            highlight_count: 0,
            onboarded: true,
        }
    }

    #[test]
    fn test_producer_vocalist_scenario() {
        let viewer = create_test_profile("v", Role::Producer, &["Pop", "Rock"]);
        let mut candidate = create_test_profile("c", Role::Vocalist, &["Pop", "Jazz"]);
        candidate.verified = true;
        candidate.highlight_count = 2;
        candidate.rating = 4.5;

        let breakdown = score_breakdown(&viewer, &candidate);
        assert_eq!(breakdown.genre, 20.0);
        assert_eq!(breakdown.role, 30.0);
        assert_eq!(breakdown.activity, 30.0);
        assert_eq!(breakdown.total, 80.0);
    }

    #[test]
    fn test_empty_genres_score_zero_overlap() {
        let viewer = create_test_profile("v", Role::Producer, &[]);
        let mut candidate = create_test_profile("c", Role::Vocalist, &[]);
        candidate.verified = true;

        // Role complement + verification only
        assert_eq!(score(&viewer, &candidate), 45.0);
    }

    #[test]
    fn test_non_complementary_role() {
        let viewer = create_test_profile("v", Role::Mixer, &["House"]);
        let candidate = create_test_profile("c", Role::Mixer, &["House"]);

        assert_eq!(score(&viewer, &candidate), 40.0);
    }

    #[test]
    fn test_rating_bonus_is_strict() {
        let viewer = create_test_profile("v", Role::Mixer, &[]);
        let mut candidate = create_test_profile("c", Role::Mixer, &[]);
        candidate.rating = 4.0;
        assert_eq!(score(&viewer, &candidate), 0.0);

        candidate.rating = 4.01;
        assert_eq!(score(&viewer, &candidate), 5.0);
    }

    #[test]
    fn test_score_is_deterministic_and_bounded() {
        let viewer = create_test_profile("v", Role::Songwriter, &["Folk", "Indie", "Pop"]);
        let mut candidate = create_test_profile("c", Role::Producer, &["Folk", "Indie", "Pop"]);
        candidate.verified = true;
        candidate.highlight_count = 10;
        candidate.rating = 5.0;

        let first = score(&viewer, &candidate);
        let second = score(&viewer, &candidate);
        assert_eq!(first, second);
        assert_eq!(first, 100.0);
    }

    #[test]
    fn test_every_role_has_complements() {
        for role in [
            Role::Producer,
            Role::Vocalist,
            Role::Songwriter,
            Role::Instrumentalist,
            Role::Mixer,
            Role::AandR,
        ] {
            assert!(!complements(role).is_empty());
            assert!(!complements(role).contains(&role));
        }
    }
}
