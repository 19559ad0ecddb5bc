//! Candidate selection across every source in one cycle
//!
//! Comparison keys, in priority order:
//! 1. buy/sell ratio, only when both sides have a numeric ratio
//! 2. score
//! 3. 6h price change
//! 4. first-seen order (sources run in configured order)
//!
//! A missing key falls through to the next one rather than reading as zero.

use std::cmp::Ordering;

use crate::core::types::ScoredCandidate;

/// Compare two candidates; `Greater` means `a` ranks above `b`.
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    if let (Some(ra), Some(rb)) = (a.buy_sell_ratio().value(), b.buy_sell_ratio().value()) {
        match ra.partial_cmp(&rb) {
            Some(Ordering::Equal) | None => {}
            Some(ordering) => return ordering,
        }
    }

    match a.score.partial_cmp(&b.score) {
        Some(Ordering::Equal) | None => {}
        Some(ordering) => return ordering,
    }

    a.record
        .change_6h()
        .partial_cmp(&b.record.change_6h())
        .unwrap_or(Ordering::Equal)
}

/// Pick the single best candidate from `pool`, which must already be in
/// first-seen order. Ties keep the earlier candidate.
///
/// The comparator is not a total order once the ratio key is skipped for
/// some pairs, so this is a single pass that only replaces the current
/// winner on a strict win instead of a sort.
pub fn select_winner(pool: &[ScoredCandidate]) -> Option<&ScoredCandidate> {
    let mut candidates = pool.iter();
    let mut winner = candidates.next()?;
    for candidate in candidates {
        if compare(candidate, winner) == Ordering::Greater {
            winner = candidate;
        }
    }
    Some(winner)
}
