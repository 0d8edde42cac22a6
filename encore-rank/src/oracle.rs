//! Comparison oracle contract and implementations
//!
//! The engine never decides preference itself: it asks an oracle which of
//! two reviews the user prefers and awaits the answer before choosing the
//! next pair. Production wires the oracle to an interactive prompt; tests
//! use a scripted fixture.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use encore_common::{Error, Result, ReviewItem};

/// Outcome of one pairwise comparison
///
/// Exactly one winner; the oracle contract has no ties.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Id of the preferred review
    pub winner_id: String,
    /// Id of the other review
    pub loser_id: String,
}

impl Comparison {
    /// Build an outcome from the winning review and the other candidate
    pub fn won_by(winner: &ReviewItem, loser: &ReviewItem) -> Self {
        Self {
            winner_id: winner.id.clone(),
            loser_id: loser.id.clone(),
        }
    }
}

/// Capability interface resolving pairwise preference between two reviews
///
/// An error from `compare` cancels the whole ranking operation that issued
/// it; the engine never retries a comparison.
#[async_trait]
pub trait ComparisonOracle: Send + Sync {
    /// Ask which of the two reviews is preferred
    async fn compare(&self, a: &ReviewItem, b: &ReviewItem) -> Result<Comparison>;
}

/// One pending comparison forwarded to an interactive answerer
#[derive(Debug)]
pub struct ComparisonRequest {
    /// First candidate
    pub left: ReviewItem,
    /// Second candidate
    pub right: ReviewItem,
    /// Reply channel; send the outcome to resume the ranking operation
    pub respond: oneshot::Sender<Comparison>,
}

/// Oracle that forwards comparisons over an mpsc channel
///
/// The UI end receives [`ComparisonRequest`]s, shows the prompt, and
/// replies on the embedded oneshot sender. Dropping either channel end
/// (prompt dismissed, UI gone) surfaces as [`Error::Oracle`] and cancels
/// the in-flight operation.
#[derive(Clone)]
pub struct ChannelOracle {
    tx: mpsc::Sender<ComparisonRequest>,
}

impl ChannelOracle {
    /// Create an oracle and the receiving end for the answerer
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ComparisonRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ComparisonOracle for ChannelOracle {
    async fn compare(&self, a: &ReviewItem, b: &ReviewItem) -> Result<Comparison> {
        let (respond, reply) = oneshot::channel();
        let request = ComparisonRequest {
            left: a.clone(),
            right: b.clone(),
            respond,
        };
        self.tx
            .send(request)
            .await
            .map_err(|_| Error::Oracle("comparison prompt closed".to_string()))?;
        reply
            .await
            .map_err(|_| Error::Oracle("comparison dismissed without an answer".to_string()))
    }
}

/// Deterministic oracle answering from a preset winner list
///
/// Each scripted entry names the id that wins the next comparison, in
/// order. Running out of answers is an oracle error, which tests use to
/// simulate a dismissed prompt. An entry naming neither compared review is
/// passed through untouched so response validation can be exercised.
#[derive(Default)]
pub struct ScriptedOracle {
    winners: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Script the winners of the next comparisons, in order
    pub fn new<I, S>(winners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            winners: Mutex::new(winners.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Oracle that must never be consulted
    pub fn unreachable() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Number of comparisons issued so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComparisonOracle for ScriptedOracle {
    async fn compare(&self, a: &ReviewItem, b: &ReviewItem) -> Result<Comparison> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let winner = self
            .winners
            .lock()
            .map_err(|_| Error::Oracle("scripted oracle lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| Error::Oracle("no scripted answer left".to_string()))?;
        if winner == a.id {
            Ok(Comparison::won_by(a, b))
        } else if winner == b.id {
            Ok(Comparison::won_by(b, a))
        } else {
            Ok(Comparison {
                winner_id: winner,
                loser_id: a.id.clone(),
            })
        }
    }
}
