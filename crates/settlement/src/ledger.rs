use czrpay_types::MatchId;
use std::collections::HashSet;
use std::sync::RwLock;

/// Append-only record of obligations whose settlement has been committed.
///
/// `mark_committed` is the single guard against paying the same match twice
/// and must succeed before any broadcast starts. Entries are only dropped by
/// a full [`reset`](Self::reset) or [`replace_all`](Self::replace_all) during
/// restore.
#[derive(Debug, Default)]
pub struct CommitLedger {
    committed: RwLock<HashSet<MatchId>>,
}

impl CommitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a commit. Returns false if the id was already present.
    pub fn mark_committed(&self, match_id: &MatchId) -> bool {
        self.committed
            .write()
            .expect("commit ledger lock poisoned")
            .insert(match_id.clone())
    }

    pub fn is_committed(&self, match_id: &MatchId) -> bool {
        self.committed
            .read()
            .expect("commit ledger lock poisoned")
            .contains(match_id)
    }

    pub fn len(&self) -> usize {
        self.committed
            .read()
            .expect("commit ledger lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn committed_ids(&self) -> Vec<MatchId> {
        self.committed
            .read()
            .expect("commit ledger lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn reset(&self) {
        self.committed
            .write()
            .expect("commit ledger lock poisoned")
            .clear();
    }

    /// Swap the whole set for a persisted one
    pub fn replace_all<I>(&self, ids: I)
    where
        I: IntoIterator<Item = MatchId>,
    {
        let fresh: HashSet<MatchId> = ids.into_iter().collect();
        *self.committed.write().expect("commit ledger lock poisoned") = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mark_committed_once() {
        let ledger = CommitLedger::new();
        let id = MatchId::from_legs("aa", "bb");

        assert!(!ledger.is_committed(&id));
        assert!(ledger.mark_committed(&id));
        assert!(ledger.is_committed(&id));

        for _ in 0..5 {
            assert!(!ledger.mark_committed(&id));
        }
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_concurrent_commits_single_winner() {
        let ledger = Arc::new(CommitLedger::new());
        let id = MatchId::from_legs("aa", "bb");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                let id = id.clone();
                std::thread::spawn(move || ledger.mark_committed(&id))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_replace_all_and_reset() {
        let ledger = CommitLedger::new();
        ledger.mark_committed(&MatchId::from_legs("x", "y"));

        ledger.replace_all(vec![
            MatchId::from_legs("aa", "bb"),
            MatchId::from_legs("cc", "dd"),
        ]);
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.is_committed(&MatchId::from_legs("x", "y")));
        assert!(ledger.is_committed(&MatchId::from_legs("cc", "dd")));

        ledger.reset();
        assert!(ledger.is_empty());
    }
}
