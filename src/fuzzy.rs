use itertools::Itertools;
use rapidfuzz::fuzz;

/// Best reference for one source name.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub source: String,
    pub matched: String,
    /// 0 (nothing in common) to 100 (identical ignoring case).
    pub score: u8,
}

/// Case-insensitive similarity on a 0-100 scale: `2 * M / T`, where `M` is the
/// number of characters kept by the cheapest insert/delete edit and `T` the
/// combined length.
pub fn similarity(a: &str, b: &str) -> u8 {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    let ratio = fuzz::ratio(a.chars(), b.chars());
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Matches every distinct source name against every reference name and keeps
/// the highest scoring reference. Ties go to the earlier reference. No
/// threshold is applied here; callers decide what score is good enough.
pub fn match_all<S, R>(source_names: &[S], reference_names: &[R]) -> Vec<MatchResult>
where
    S: AsRef<str>,
    R: AsRef<str>,
{
    if reference_names.is_empty() {
        return Vec::new();
    }

    source_names
        .iter()
        .map(|s| s.as_ref())
        .unique()
        .filter_map(|source| {
            let mut best: Option<(&str, u8)> = None;
            for candidate in reference_names.iter().map(|r| r.as_ref()) {
                let score = similarity(source, candidate);
                if best.map(|(_, s)| score > s).unwrap_or(true) {
                    best = Some((candidate, score));
                }
            }
            best.map(|(matched, score)| MatchResult {
                source: source.to_owned(),
                matched: matched.to_owned(),
                score,
            })
        })
        .collect()
}
