/// Example demonstrating the settlement stores
///
/// Records a commit and a few state transitions in both the in-memory and
/// the SQLite store, then reads the journal back.
use czrpay_settlement::{
    InMemoryStore, SettlementState, SettlementStore, SqliteStore, StateTransition,
};
use czrpay_types::MatchId;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Settlement Store Demo ===\n");

    println!("1. Using InMemoryStore:");
    run(Arc::new(InMemoryStore::new())).await?;

    println!("\n2. Using SqliteStore (in memory):");
    run(Arc::new(SqliteStore::in_memory().await?)).await?;

    Ok(())
}

async fn run(store: Arc<dyn SettlementStore>) -> Result<(), Box<dyn std::error::Error>> {
    let match_id = MatchId::from_legs(&"a".repeat(64), &"b".repeat(64));

    for (from, to, height) in [
        (SettlementState::Detected, SettlementState::Upcoming, 100),
        (SettlementState::Upcoming, SettlementState::Active, 106),
        (SettlementState::Active, SettlementState::AutoSettling, 106),
        (SettlementState::AutoSettling, SettlementState::Broadcasting, 106),
    ] {
        store
            .record_transition(StateTransition::new(match_id.clone(), from, to, height))
            .await?;
    }

    store.record_commit(&match_id, 106).await?;
    store
        .record_transition(
            StateTransition::new(
                match_id.clone(),
                SettlementState::Broadcasting,
                SettlementState::Committed,
                106,
            )
            .with_tx_hash("c0ffee"),
        )
        .await?;

    // Recording the commit again is a no-op
    store.record_commit(&match_id, 107).await?;

    let commits = store.list_commits().await?;
    println!("  Commits: {}", commits.len());
    for commit in &commits {
        println!("    {} at height {}", commit.match_id, commit.height);
    }

    println!("  History:");
    for transition in store.history(&match_id).await? {
        println!(
            "    {:>12} -> {:<12} height={} tx={}",
            transition.from,
            transition.to,
            transition.height,
            transition.tx_hash.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
