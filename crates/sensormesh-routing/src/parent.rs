//! Parent-link state: distance tracking, candidate adoption, loss detection.

use sensormesh_core::constants::{DISTANCE_INVALID, is_valid_distance};

use crate::constants::SEARCH_FAILURES;

/// The link toward the gateway.
///
/// `distance` is the hop count to the gateway through `parent`;
/// [`DISTANCE_INVALID`] means the parent is unverified and a search must run
/// before the next parent-bound transmission.
#[derive(Debug, Clone, Copy)]
pub struct ParentLink {
    pub parent: u8,
    pub distance: u8,
    /// Whether parent loss may trigger automatic re-discovery. False when a
    /// fixed parent was configured.
    pub auto_find: bool,
    failed_transmissions: u8,
}

impl ParentLink {
    pub fn new(parent: u8, distance: u8, auto_find: bool) -> Self {
        ParentLink {
            parent,
            distance,
            auto_find,
            failed_transmissions: 0,
        }
    }

    /// Whether a parent search must run before sending toward the gateway.
    #[must_use]
    pub fn needs_search(&self) -> bool {
        !is_valid_distance(self.distance)
    }

    /// Force re-discovery on the next parent-bound send.
    pub fn invalidate(&mut self) {
        self.distance = DISTANCE_INVALID;
    }

    /// Evaluate a parent-search response.
    ///
    /// The candidate distance is one more than the responder's. The
    /// responder is adopted iff that is strictly smaller than the current
    /// distance. Returns true on adoption (the caller persists the change).
    pub fn consider_candidate(&mut self, responder: u8, responder_distance: u8) -> bool {
        if !is_valid_distance(responder_distance) {
            return false;
        }
        let candidate = responder_distance.wrapping_add(1);
        if is_valid_distance(candidate) && candidate < self.distance {
            self.parent = responder;
            self.distance = candidate;
            return true;
        }
        false
    }

    /// Account for the outcome of a transmission to the parent.
    ///
    /// Returns true when the parent is declared lost: `SEARCH_FAILURES`
    /// consecutive failures with auto-discovery enabled invalidate the
    /// distance so the next send re-runs the search.
    pub fn record_parent_send(&mut self, ok: bool) -> bool {
        if ok {
            self.failed_transmissions = 0;
            return false;
        }
        self.failed_transmissions = self.failed_transmissions.saturating_add(1);
        if self.auto_find && self.failed_transmissions >= SEARCH_FAILURES {
            self.invalidate();
            self.failed_transmissions = 0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensormesh_core::AUTO;

    #[test]
    fn test_adopts_strictly_closer_responder() {
        let mut link = ParentLink::new(AUTO, DISTANCE_INVALID, true);

        assert!(link.consider_candidate(9, 5));
        assert_eq!(link.parent, 9);
        assert_eq!(link.distance, 6);

        // A closer responder wins.
        assert!(link.consider_candidate(4, 3));
        assert_eq!(link.parent, 4);
        assert_eq!(link.distance, 4);

        // An equal or farther one does not.
        assert!(!link.consider_candidate(7, 3));
        assert!(!link.consider_candidate(7, 5));
        assert_eq!(link.parent, 4);
        assert_eq!(link.distance, 4);
    }

    #[test]
    fn test_gateway_responder_gives_distance_one() {
        let mut link = ParentLink::new(AUTO, DISTANCE_INVALID, true);
        assert!(link.consider_candidate(0, 0));
        assert_eq!(link.distance, 1);
    }

    #[test]
    fn test_invalid_responder_distance_rejected() {
        let mut link = ParentLink::new(AUTO, DISTANCE_INVALID, true);
        assert!(!link.consider_candidate(9, DISTANCE_INVALID));
        assert!(link.needs_search());
    }

    #[test]
    fn test_candidate_overflowing_to_invalid_rejected() {
        // Responder at distance 0xFE would put us at 0xFF, the sentinel.
        let mut link = ParentLink::new(AUTO, DISTANCE_INVALID, true);
        assert!(!link.consider_candidate(9, 0xFE));
        assert!(link.needs_search());
    }

    #[test]
    fn test_parent_lost_after_threshold_failures() {
        let mut link = ParentLink::new(3, 2, true);
        for _ in 0..SEARCH_FAILURES - 1 {
            assert!(!link.record_parent_send(false));
            assert!(!link.needs_search());
        }
        assert!(link.record_parent_send(false));
        assert!(link.needs_search());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let mut link = ParentLink::new(3, 2, true);
        for _ in 0..SEARCH_FAILURES - 1 {
            link.record_parent_send(false);
        }
        link.record_parent_send(true);
        for _ in 0..SEARCH_FAILURES - 1 {
            assert!(!link.record_parent_send(false));
        }
        assert!(!link.needs_search());
    }

    #[test]
    fn test_fixed_parent_never_declared_lost() {
        let mut link = ParentLink::new(3, 0, false);
        for _ in 0..SEARCH_FAILURES * 2 {
            assert!(!link.record_parent_send(false));
        }
        assert!(!link.needs_search());
    }
}
