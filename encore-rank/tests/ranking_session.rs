//! End-to-end ranking session tests
//!
//! Drive the engine the way the production UI does: comparisons arrive as
//! requests on a channel and are answered out of band while the ranking
//! call is still pending, with rank events observed on the session bus.

use std::sync::Arc;

use encore_common::{RankEvent, Rating, ReviewItem};
use encore_rank::{
    ChannelOracle, Comparison, RankingEngine, ScriptedOracle, SessionRegistry,
};

fn review(id: &str, title: &str, rating: Rating) -> ReviewItem {
    ReviewItem::new(id, title, rating)
}

/// Seed a bucket in the given order, each new review losing its first
/// comparison
async fn seed(engine: &RankingEngine, rating: Rating, ids: &[&str]) {
    for (i, id) in ids.iter().enumerate() {
        let oracle = if i == 0 {
            ScriptedOracle::unreachable()
        } else {
            ScriptedOracle::new([ids[i - 1]])
        };
        engine
            .insert(review(id, &format!("{id} show"), rating), &oracle)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn channel_oracle_session_ranks_a_new_review() {
    let registry = SessionRegistry::new(16);
    let engine = registry.engine_for("ana").await;
    seed(&engine, Rating::Good, &["a", "b", "c"]).await;

    let mut events = engine.events().subscribe();
    let (oracle, mut requests) = ChannelOracle::new(4);

    // The new show beats c and b, then loses to a
    let answerer = tokio::spawn(async move {
        let mut served = 0usize;
        while let Some(request) = requests.recv().await {
            served += 1;
            let outcome = if served <= 2 {
                pick(&request.left, &request.right, "d")
            } else {
                pick(&request.left, &request.right, "a")
            };
            request.respond.send(outcome).unwrap();
            if served == 3 {
                break;
            }
        }
        served
    });

    let position = engine
        .insert(review("d", "d show", Rating::Good), &oracle)
        .await
        .unwrap();
    assert_eq!(position, 1);
    assert_eq!(answerer.await.unwrap(), 3);

    let order: Vec<String> = engine
        .ranking(Rating::Good)
        .await
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(order, ["a", "d", "b", "c"]);

    // Snapshots serialize for transport to a UI
    let snapshot = engine.all_rankings().await;
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["good"][1]["id"], "d");
    assert_eq!(json["good"][1]["position"], 1);

    // Subscribed after seeding, so the first event is the insert itself
    match events.recv().await.unwrap() {
        RankEvent::ReviewInserted {
            review_id,
            position,
            comparisons,
            ..
        } => {
            assert_eq!(review_id, "d");
            assert_eq!(position, 1);
            assert_eq!(comparisons, 3);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn dismissed_prompt_cancels_cleanly_mid_bubble() {
    let registry = SessionRegistry::new(16);
    let engine = registry.engine_for("ana").await;
    seed(&engine, Rating::Good, &["a", "b"]).await;

    let (oracle, mut requests) = ChannelOracle::new(4);

    // First prompt answered (new review wins), second dismissed by
    // dropping the receiver
    let answerer = tokio::spawn(async move {
        let request = requests.recv().await.unwrap();
        let outcome = pick(&request.left, &request.right, "c");
        request.respond.send(outcome).unwrap();
        // Receiver dropped here; the engine's next send fails
    });

    let err = engine
        .insert(review("c", "c show", Rating::Good), &oracle)
        .await
        .unwrap_err();
    assert!(matches!(err, encore_common::Error::Oracle(_)));
    answerer.await.unwrap();

    // The committed swap with b survives; positions stay in sync
    let bucket = engine.ranking(Rating::Good).await;
    let order: Vec<&str> = bucket.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(order, ["a", "c", "b"]);
    for (i, r) in bucket.iter().enumerate() {
        assert_eq!(r.position, i);
    }
}

#[tokio::test]
async fn mutations_on_a_shared_session_serialize() {
    let registry = SessionRegistry::new(16);
    let engine = registry.engine_for("ana").await;
    seed(&engine, Rating::Good, &["a"]).await;

    // One answerer serving both inserts: the bubbling review always wins,
    // so each insert walks to the top no matter which runs first
    let (oracle, mut requests) = ChannelOracle::new(4);
    let answerer = tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let outcome = Comparison::won_by(&request.left, &request.right);
            request.respond.send(outcome).ok();
        }
    });

    let first = {
        let engine = Arc::clone(&engine);
        let oracle = oracle.clone();
        tokio::spawn(async move {
            engine
                .insert(review("b", "b show", Rating::Good), &oracle)
                .await
                .unwrap()
        })
    };
    let second = {
        let engine = Arc::clone(&engine);
        let oracle = oracle.clone();
        tokio::spawn(async move {
            engine
                .insert(review("c", "c show", Rating::Good), &oracle)
                .await
                .unwrap()
        })
    };

    // Both bubble-ups complete; the engine ran them one at a time, so no
    // position was ever shifted out from under a pending comparison
    assert_eq!(first.await.unwrap(), 0);
    assert_eq!(second.await.unwrap(), 0);
    drop(oracle);
    answerer.await.unwrap();

    let bucket = engine.ranking(Rating::Good).await;
    assert_eq!(bucket.len(), 3);
    assert_eq!(bucket.last().map(|r| r.id.as_str()), Some("a"));
    for (i, r) in bucket.iter().enumerate() {
        assert_eq!(r.position, i);
    }
}

#[tokio::test]
async fn registry_scopes_rankings_per_user() {
    let registry = SessionRegistry::new(16);
    let ana = registry.engine_for("ana").await;
    let ben = registry.engine_for("ben").await;

    seed(&ana, Rating::Okay, &["a1", "a2"]).await;
    seed(&ben, Rating::Okay, &["b1"]).await;

    assert_eq!(ana.len(Rating::Okay).await, 2);
    assert_eq!(ben.len(Rating::Okay).await, 1);
    assert_eq!(registry.len().await, 2);

    assert!(registry.drop_session("ben").await);
    assert_eq!(registry.len().await, 1);
    // Ana's order is untouched by Ben's session ending
    assert_eq!(ana.len(Rating::Okay).await, 2);
}

/// Answer a comparison request in favor of the review with `winner_id`
fn pick(left: &ReviewItem, right: &ReviewItem, winner_id: &str) -> Comparison {
    if left.id == winner_id {
        Comparison::won_by(left, right)
    } else {
        Comparison::won_by(right, left)
    }
}
