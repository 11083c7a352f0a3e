//! Position-weighted domain presence scoring.
//!
//! A provider's score is the best rank at which the target domain appears
//! among its citations:
//!
//! ```text
//! position_score = max(100 - (position - 1) * 10, 10)
//! ```
//!
//! Providers are combined by averaging only the providers that found the
//! domain at all. A single strong match is therefore not diluted by
//! providers that found nothing; the overall figure rewards presence
//! rather than consensus.

use crate::types::{Citation, ProviderScore};

/// Score for a match at position 1.
pub const TOP_POSITION_SCORE: u32 = 100;

/// Points lost per rank below the top.
pub const POSITION_STEP: u32 = 10;

/// Minimum score for any match, however deep.
pub const MIN_MATCH_SCORE: u32 = 10;

/// Score a single match at the given 1-based position.
///
/// Position 1 scores 100, each further rank costs 10 points, and no match
/// scores below 10. Position 0 is treated like position 1.
pub fn position_score(position: u32) -> u32 {
    let penalty = position.saturating_sub(1).saturating_mul(POSITION_STEP);
    TOP_POSITION_SCORE
        .saturating_sub(penalty)
        .max(MIN_MATCH_SCORE)
}

/// Evaluate one provider's citations for `domain`.
///
/// A citation matches when the lower-cased domain is a substring of its
/// lower-cased URL or title. The provider score is the highest
/// [`position_score`] among matches; citations without a position count as
/// [`crate::types::UNRANKED_POSITION`]. A blank domain matches nothing.
pub fn score_citations(citations: &[Citation], domain: &str) -> ProviderScore {
    let needle = domain.trim().to_lowercase();
    if needle.is_empty() {
        return ProviderScore::default();
    }

    let mut result = ProviderScore::default();
    for citation in citations {
        let url = citation.url.to_lowercase();
        let title = citation.title.to_lowercase();
        if !url.contains(&needle) && !title.contains(&needle) {
            continue;
        }
        let position = citation.effective_position();
        result.domain_found = true;
        result.score = result.score.max(position_score(position));
        result.matched_positions.push(position);
    }
    result
}

/// Combine provider scores into one overall figure.
///
/// Returns the mean of the non-zero scores rounded to one decimal place, or
/// `0.0` when no provider found the domain. Zero scores are left out of the
/// mean on purpose.
pub fn overall_score<I>(scores: I) -> f64
where
    I: IntoIterator<Item = u32>,
{
    let non_zero: Vec<u32> = scores.into_iter().filter(|s| *s > 0).collect();
    if non_zero.is_empty() {
        return 0.0;
    }
    let sum: u64 = non_zero.iter().map(|s| u64::from(*s)).sum();
    let mean = sum as f64 / non_zero.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Number of providers with a non-zero score.
pub fn providers_with_presence<I>(scores: I) -> usize
where
    I: IntoIterator<Item = u32>,
{
    scores.into_iter().filter(|s| *s > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(position: Option<u32>, url: &str, title: &str) -> Citation {
        Citation {
            position,
            url: url.into(),
            title: title.into(),
        }
    }

    #[test]
    fn first_position_scores_100() {
        assert_eq!(position_score(1), 100);
    }

    #[test]
    fn each_rank_costs_ten_points() {
        assert_eq!(position_score(2), 90);
        assert_eq!(position_score(5), 60);
        assert_eq!(position_score(10), 10);
    }

    #[test]
    fn deep_positions_hit_the_floor() {
        assert_eq!(position_score(11), 10);
        assert_eq!(position_score(999), 10);
        assert_eq!(position_score(u32::MAX), 10);
    }

    #[test]
    fn position_score_is_non_increasing_and_bounded() {
        let scores: Vec<u32> = (1..=50).map(position_score).collect();
        for pair in scores.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(scores.iter().all(|s| *s >= MIN_MATCH_SCORE));
    }

    #[test]
    fn no_match_scores_zero() {
        let citations = vec![
            citation(Some(1), "https://other.com/a", "Other"),
            citation(Some(2), "https://another.org", ""),
        ];
        let score = score_citations(&citations, "shop.com");
        assert_eq!(score, ProviderScore::default());
        assert!(!score.domain_found);
    }

    #[test]
    fn best_match_wins() {
        let citations = vec![
            citation(Some(1), "https://shop.com/kettle", ""),
            citation(Some(2), "https://other.com", ""),
            citation(Some(5), "https://shop.com/other", ""),
        ];
        let score = score_citations(&citations, "shop.com");
        assert_eq!(score.score, 100);
        assert!(score.domain_found);
        assert_eq!(score.matched_positions, vec![1, 5]);
    }

    #[test]
    fn matching_is_case_insensitive_on_url_and_title() {
        let citations = vec![
            citation(Some(3), "https://news.example/review", "Best kettles at SHOP.com"),
            citation(Some(4), "https://WWW.Shop.Com/p/1", ""),
        ];
        let score = score_citations(&citations, "Shop.com");
        assert_eq!(score.score, 80);
        assert_eq!(score.matched_positions, vec![3, 4]);
    }

    #[test]
    fn unranked_match_scores_floor() {
        let citations = vec![citation(None, "https://shop.com", "")];
        let score = score_citations(&citations, "shop.com");
        assert_eq!(score.score, MIN_MATCH_SCORE);
        assert_eq!(score.matched_positions, vec![crate::types::UNRANKED_POSITION]);
    }

    #[test]
    fn blank_domain_matches_nothing() {
        let citations = vec![citation(Some(1), "https://shop.com", "")];
        assert!(!score_citations(&citations, "  ").domain_found);
    }

    #[test]
    fn overall_ignores_zero_scores() {
        assert!((overall_score([100, 0, 40]) - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overall_all_zero_is_zero() {
        assert!(overall_score([0, 0, 0]).abs() < f64::EPSILON);
        assert!(overall_score(Vec::<u32>::new()).abs() < f64::EPSILON);
    }

    #[test]
    fn overall_rounds_to_one_decimal() {
        // (100 + 90 + 10) / 3 = 66.666…
        assert!((overall_score([100, 90, 10]) - 66.7).abs() < 1e-9);
    }

    #[test]
    fn presence_count_excludes_zeros() {
        assert_eq!(providers_with_presence([100, 0, 40]), 2);
        assert_eq!(providers_with_presence([0, 0]), 0);
    }
}
