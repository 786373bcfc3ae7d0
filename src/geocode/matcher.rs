//! Candidate matching against the expected state.
//!
//! Tiers, in strict order: country filter → exact state → partial state
//! (4-character prefix, either direction) → first result in country.

use super::normalize::{normalize, prefix};
use super::types::{Candidate, Coordinate, MatchTier};

const PARTIAL_PREFIX_LEN: usize = 4;

/// A matcher decision: the chosen coordinate and the tier that chose it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub coordinate: Coordinate,
    pub tier: MatchTier,
}

/// Pick one coordinate out of `candidates` for a district whose state is
/// `expected_region`. Returns `None` when nothing in `country` qualifies.
pub fn resolve(candidates: &[Candidate], expected_region: &str, country: &str) -> Option<Match> {
    let in_country: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.country_code.as_deref() == Some(country))
        .collect();

    if in_country.is_empty() {
        return None;
    }

    let expected = normalize(expected_region);
    let labelled: Vec<(String, Coordinate)> = in_country
        .iter()
        .filter_map(|c| Some((normalize(c.admin1.as_deref()?), c.coordinate()?)))
        .collect();

    // Exact match
    if let Some((_, coordinate)) = labelled.iter().find(|(label, _)| *label == expected) {
        return Some(Match {
            coordinate: *coordinate,
            tier: MatchTier::Exact,
        });
    }

    // Partial match
    let expected_head = prefix(&expected, PARTIAL_PREFIX_LEN);
    if let Some((_, coordinate)) = labelled.iter().find(|(label, _)| {
        label.contains(expected_head) || expected.contains(prefix(label, PARTIAL_PREFIX_LEN))
    }) {
        return Some(Match {
            coordinate: *coordinate,
            tier: MatchTier::Partial,
        });
    }

    in_country
        .iter()
        .find_map(|c| c.coordinate())
        .map(|coordinate| Match {
            coordinate,
            tier: MatchTier::FirstResult,
        })
}

/// First in-country candidate with usable coordinates, ignoring labels.
/// Used when the query itself is the state name.
pub fn first_in_country(candidates: &[Candidate], country: &str) -> Option<Coordinate> {
    candidates
        .iter()
        .filter(|c| c.country_code.as_deref() == Some(country))
        .find_map(Candidate::coordinate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cand(country: &str, admin1: &str, lat: f64, lng: f64) -> Candidate {
        Candidate {
            name: None,
            country_code: Some(country.to_string()),
            admin1: Some(admin1.to_string()),
            latitude: Some(lat),
            longitude: Some(lng),
        }
    }

    #[test]
    fn test_country_filter_excludes_foreign() {
        let cands = vec![cand("XX", "Foo", 1.0, 1.0), cand("TR", "Bar", 2.0, 2.0)];
        let m = resolve(&cands, "Bar", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Exact);
        assert_relative_eq!(m.coordinate.lat, 2.0);
    }

    #[test]
    fn test_foreign_exact_label_never_wins() {
        let cands = vec![cand("XX", "Bar", 1.0, 1.0), cand("TR", "Baz", 2.0, 2.0)];
        let m = resolve(&cands, "Bar", "TR").unwrap();
        assert_relative_eq!(m.coordinate.lat, 2.0);
    }

    #[test]
    fn test_exact_beats_first_result() {
        let cands = vec![
            cand("TR", "Konya", 37.0, 32.0),
            cand("TR", "Ankara", 39.9, 32.8),
        ];
        let m = resolve(&cands, "Ankara", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Exact);
        assert_relative_eq!(m.coordinate.lat, 39.9);
    }

    #[test]
    fn test_exact_beats_earlier_partial() {
        let cands = vec![
            cand("TR", "Istanbul Province", 41.1, 29.0),
            cand("TR", "İstanbul", 41.0, 28.9),
        ];
        let m = resolve(&cands, "Istanbul", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Exact);
        assert_relative_eq!(m.coordinate.lng, 28.9);
    }

    #[test]
    fn test_exact_match_across_turkish_letters() {
        let cands = vec![cand("TR", "IZMIR", 38.4, 27.1)];
        let m = resolve(&cands, "İzmir", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Exact);
    }

    #[test]
    fn test_partial_match_prefix_rule() {
        let cands = vec![
            cand("TR", "Bursa", 40.2, 29.0),
            cand("TR", "Istanbul Province", 41.0, 28.9),
        ];
        let m = resolve(&cands, "Istanbul", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Partial);
        assert_relative_eq!(m.coordinate.lat, 41.0);
    }

    #[test]
    fn test_partial_match_reverse_direction() {
        // label prefix "AFYO" is inside the expected name
        let cands = vec![cand("TR", "Afyon", 38.7, 30.5)];
        let m = resolve(&cands, "Afyonkarahisar", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Partial);
    }

    #[test]
    fn test_partial_match_short_names() {
        // "VAN" has fewer than four characters; the whole string is used
        let cands = vec![cand("TR", "Konya", 37.0, 32.0), cand("TR", "Van Province", 38.5, 43.4)];
        let m = resolve(&cands, "Van", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Partial);
        assert_relative_eq!(m.coordinate.lat, 38.5);
    }

    #[test]
    fn test_empty_expected_region_matches_partially() {
        let cands = vec![cand("TR", "Konya", 37.0, 32.0)];
        let m = resolve(&cands, "", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Partial);
    }

    #[test]
    fn test_first_result_fallback() {
        let cands = vec![
            cand("DE", "Bayern", 48.0, 11.0),
            cand("TR", "Konya", 37.0, 32.0),
            cand("TR", "Hatay", 36.2, 36.1),
        ];
        let m = resolve(&cands, "Ankara", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::FirstResult);
        assert_relative_eq!(m.coordinate.lat, 37.0);
    }

    #[test]
    fn test_no_match_on_empty_or_foreign() {
        assert!(resolve(&[], "Ankara", "TR").is_none());
        let foreign = vec![cand("GR", "Attica", 38.0, 23.7)];
        assert!(resolve(&foreign, "Attica", "TR").is_none());
    }

    #[test]
    fn test_missing_label_skipped_for_label_tiers() {
        let unlabeled = Candidate {
            admin1: None,
            ..cand("TR", "", 40.0, 30.0)
        };
        let cands = vec![unlabeled, cand("TR", "Ankara", 39.9, 32.8)];
        let m = resolve(&cands, "Ankara", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::Exact);
        assert_relative_eq!(m.coordinate.lat, 39.9);
    }

    #[test]
    fn test_first_result_skips_rows_without_coordinates() {
        let broken = Candidate {
            latitude: None,
            ..cand("TR", "Konya", 0.0, 0.0)
        };
        let cands = vec![broken, cand("TR", "Hatay", 36.2, 36.1)];
        let m = resolve(&cands, "Ankara", "TR").unwrap();
        assert_eq!(m.tier, MatchTier::FirstResult);
        assert_relative_eq!(m.coordinate.lat, 36.2);
    }

    #[test]
    fn test_only_broken_rows_is_no_match() {
        let broken = Candidate {
            country_code: Some("TR".into()),
            ..Default::default()
        };
        assert!(resolve(&[broken], "Ankara", "TR").is_none());
    }

    #[test]
    fn test_coordinates_are_rounded() {
        let cands = vec![cand("TR", "Ankara", 39.933_412_9, 32.859_700_1)];
        let m = resolve(&cands, "Ankara", "TR").unwrap();
        assert_relative_eq!(m.coordinate.lat, 39.933413);
        assert_relative_eq!(m.coordinate.lng, 32.8597);
    }

    #[test]
    fn test_first_in_country() {
        let cands = vec![cand("XX", "Ankara", 1.0, 1.0), cand("TR", "Whatever", 39.9, 32.8)];
        let c = first_in_country(&cands, "TR").unwrap();
        assert_relative_eq!(c.lat, 39.9);
        assert!(first_in_country(&cands[..1], "TR").is_none());
    }
}
