//! Substring search over immutable tracker snapshots.
//!
//! Every search runs against one pinned snapshot, so results are ordered,
//! finite, and restartable: re-iterating yields identical results until a
//! newer snapshot is fetched. Searches never touch live tracker state.

use std::str::FromStr;
use std::sync::Arc;

use crate::error::TrackerError;
use crate::events::{ConnectionEvent, Decision};
use crate::snapshot::TrackerSnapshot;

/// Which event fields the query text is matched against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchScope {
    Address,
    App,
    #[default]
    Any,
}

impl FromStr for SearchScope {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "address" | "ip" => Ok(SearchScope::Address),
            "app" | "application" => Ok(SearchScope::App),
            "any" | "all" | "" => Ok(SearchScope::Any),
            other => Err(TrackerError::InvalidScope(other.to_string())),
        }
    }
}

/// Optional narrowing by decision, independent of the text query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecisionFilter {
    #[default]
    Any,
    Blocked,
    Allowed,
}

impl DecisionFilter {
    #[inline]
    fn admits(self, decision: Decision) -> bool {
        match self {
            DecisionFilter::Any => true,
            DecisionFilter::Blocked => decision.is_blocked(),
            DecisionFilter::Allowed => !decision.is_blocked(),
        }
    }
}

impl FromStr for DecisionFilter {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" | "all" | "" => Ok(DecisionFilter::Any),
            "blocked" => Ok(DecisionFilter::Blocked),
            "allowed" => Ok(DecisionFilter::Allowed),
            other => Err(TrackerError::InvalidDecisionFilter(other.to_string())),
        }
    }
}

/// A lazily-evaluated query result pinned to one snapshot.
///
/// An empty query admits every event, so `search("", scope)` is the full
/// history in insertion order.
pub struct SearchResults {
    snapshot: Arc<TrackerSnapshot>,
    query: String,
    scope: SearchScope,
    decision: DecisionFilter,
}

impl SearchResults {
    pub(crate) fn new(
        snapshot: Arc<TrackerSnapshot>,
        query: &str,
        scope: SearchScope,
        decision: DecisionFilter,
    ) -> Self {
        Self {
            snapshot,
            query: query.to_lowercase(),
            scope,
            decision,
        }
    }

    /// Restartable iteration in history (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionEvent> {
        self.snapshot.events.iter().filter(move |e| self.matches(e))
    }

    pub fn collect_events(&self) -> Vec<ConnectionEvent> {
        self.iter().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Version of the snapshot this result set is pinned to.
    pub fn snapshot_version(&self) -> u64 {
        self.snapshot.version
    }

    fn matches(&self, event: &ConnectionEvent) -> bool {
        if !self.decision.admits(event.decision) {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        let address_hit = || event.address.to_lowercase().contains(&self.query);
        let app_hit = || event.app.to_lowercase().contains(&self.query);
        match self.scope {
            SearchScope::Address => address_hit(),
            SearchScope::App => app_hit(),
            SearchScope::Any => address_hit() || app_hit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(events: Vec<ConnectionEvent>) -> Arc<TrackerSnapshot> {
        Arc::new(TrackerSnapshot {
            version: 1,
            events,
            aggregates: Vec::new(),
        })
    }

    fn events() -> Vec<ConnectionEvent> {
        vec![
            ConnectionEvent::new("1.1.1.1", Decision::Block, 10).with_app("org.example.Browser"),
            ConnectionEvent::new("2.2.2.2", Decision::Allow, 20).with_app("com.example.mail"),
            ConnectionEvent::new("10.1.1.2", Decision::Allow, 30),
        ]
    }

    #[test]
    fn scope_parsing_accepts_aliases() {
        assert_eq!("ip".parse::<SearchScope>().unwrap(), SearchScope::Address);
        assert_eq!("Application".parse::<SearchScope>().unwrap(), SearchScope::App);
        assert_eq!("".parse::<SearchScope>().unwrap(), SearchScope::Any);
    }

    #[test]
    fn unknown_scope_is_invalid_argument() {
        let err = "port".parse::<SearchScope>().unwrap_err();
        assert_eq!(err, TrackerError::InvalidScope("port".to_string()));
    }

    #[test]
    fn unknown_decision_filter_is_invalid_argument() {
        let err = "denied".parse::<DecisionFilter>().unwrap_err();
        assert_eq!(err, TrackerError::InvalidDecisionFilter("denied".to_string()));
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let results = SearchResults::new(
            snapshot(events()),
            "",
            SearchScope::Any,
            DecisionFilter::Any,
        );
        let addresses: Vec<_> = results.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(addresses, vec!["1.1.1.1", "2.2.2.2", "10.1.1.2"]);
    }

    #[test]
    fn address_scope_ignores_app_text() {
        let results = SearchResults::new(
            snapshot(events()),
            "example",
            SearchScope::Address,
            DecisionFilter::Any,
        );
        assert_eq!(results.count(), 0);
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let results = SearchResults::new(
            snapshot(events()),
            "browser",
            SearchScope::App,
            DecisionFilter::Any,
        );
        let hits = results.collect_events();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].address, "1.1.1.1");
    }

    #[test]
    fn any_scope_matches_either_field() {
        let results = SearchResults::new(
            snapshot(events()),
            "1.1.1",
            SearchScope::Any,
            DecisionFilter::Any,
        );
        let addresses: Vec<_> = results.iter().map(|e| e.address.as_str()).collect();
        // "10.1.1.2" contains "1.1.1" too; substring containment, not prefix.
        assert_eq!(addresses, vec!["1.1.1.1", "10.1.1.2"]);
    }

    #[test]
    fn decision_filter_narrows_results() {
        let results = SearchResults::new(
            snapshot(events()),
            "",
            SearchScope::Any,
            DecisionFilter::Blocked,
        );
        let addresses: Vec<_> = results.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(addresses, vec!["1.1.1.1"]);
    }

    #[test]
    fn iteration_is_restartable_and_idempotent() {
        let results = SearchResults::new(
            snapshot(events()),
            "2.2",
            SearchScope::Address,
            DecisionFilter::Any,
        );
        let first: Vec<_> = results.iter().cloned().collect();
        let second: Vec<_> = results.iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
