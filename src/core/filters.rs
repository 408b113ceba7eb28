use std::collections::HashSet;

use crate::core::scoring::score;
use crate::models::{CandidateEntry, Match, Profile};

/// Ids of everyone the viewer is already paired with, in either slot
pub fn matched_partner_ids<'a>(viewer_id: &str, matches: &'a [Match]) -> HashSet<&'a str> {
    matches
        .iter()
        .filter_map(|m| m.partner_of(viewer_id))
        .collect()
}

/// Check if a profile may appear in the viewer's deck
///
/// Excludes the viewer, profiles that have not finished onboarding and
/// anyone already matched with the viewer.
#[inline]
pub fn is_eligible(viewer: &Profile, profile: &Profile, matched: &HashSet<&str>) -> bool {
    if profile.id == viewer.id {
        return false;
    }

    if !profile.onboarded {
        return false;
    }

    !matched.contains(profile.id.as_str())
}

/// Build the ordered candidate queue for a viewer
///
/// Candidates are sorted by descending score. The sort is stable, so equal
/// scores keep directory order.
pub fn build_queue(viewer: &Profile, profiles: Vec<Profile>, matches: &[Match]) -> Vec<CandidateEntry> {
    let matched = matched_partner_ids(&viewer.id, matches);

    let mut queue: Vec<CandidateEntry> = profiles
        .into_iter()
        .filter(|profile| is_eligible(viewer, profile, &matched))
        .map(|profile| CandidateEntry {
            score: score(viewer, &profile),
            profile,
        })
        .collect();

    queue.sort_by(|a, b| b.score.total_cmp(&a.score));
    queue
}
