//! Interactive pairwise ranking engine
//!
//! Owns three ordered review sequences (one per rating bucket) and keeps
//! each in the user's preferred order by asking an injected oracle to pick
//! between two shows whenever an ordering decision is needed.
//!
//! Ordering is never derived from a stored score: a newly inserted review
//! starts at the least-preferred end of its bucket and bubbles upward, one
//! awaited comparison at a time, until it loses a comparison or reaches
//! the top. Worst case that costs `n` comparisons, best case exactly one,
//! and no index is ever revisited within one pass.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use encore_common::{Error, EventBus, RankEvent, Rating, Result, ReviewItem};

use crate::oracle::{Comparison, ComparisonOracle};

/// Default event channel capacity for a session engine
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Direction for a single-step manual move within a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Snapshot of all three buckets in position order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Rankings {
    pub good: Vec<ReviewItem>,
    pub okay: Vec<ReviewItem>,
    pub bad: Vec<ReviewItem>,
}

impl Rankings {
    /// One bucket of the snapshot
    pub fn bucket(&self, rating: Rating) -> &[ReviewItem] {
        match rating {
            Rating::Good => &self.good,
            Rating::Okay => &self.okay,
            Rating::Bad => &self.bad,
        }
    }

    /// All reviews in hierarchy order: good first, then okay, then bad
    pub fn combined(&self) -> Vec<ReviewItem> {
        let mut all = Vec::with_capacity(self.good.len() + self.okay.len() + self.bad.len());
        all.extend(self.good.iter().cloned());
        all.extend(self.okay.iter().cloned());
        all.extend(self.bad.iter().cloned());
        all
    }
}

/// The three bucket sequences
///
/// Invariant: `bucket[i].position == i` for every bucket after every
/// completed mutation. The sequences are never aliased outside the engine;
/// queries hand out clones.
#[derive(Debug, Default)]
struct Buckets {
    good: Vec<ReviewItem>,
    okay: Vec<ReviewItem>,
    bad: Vec<ReviewItem>,
}

impl Buckets {
    fn bucket(&self, rating: Rating) -> &Vec<ReviewItem> {
        match rating {
            Rating::Good => &self.good,
            Rating::Okay => &self.okay,
            Rating::Bad => &self.bad,
        }
    }

    fn bucket_mut(&mut self, rating: Rating) -> &mut Vec<ReviewItem> {
        match rating {
            Rating::Good => &mut self.good,
            Rating::Okay => &mut self.okay,
            Rating::Bad => &mut self.bad,
        }
    }

    /// Locate a review across all buckets
    fn locate(&self, review_id: &str) -> Option<(Rating, usize)> {
        for rating in Rating::ALL {
            if let Some(index) = self.bucket(rating).iter().position(|r| r.id == review_id) {
                return Some((rating, index));
            }
        }
        None
    }
}

/// Per-session ranking engine
///
/// One instance per user session; nothing is persisted. All mutating
/// operations serialize on an internal async mutex held across their
/// oracle calls, so a second ranking action issued while a comparison
/// prompt is still open waits instead of interleaving with the first.
pub struct RankingEngine {
    buckets: Mutex<Buckets>,
    events: EventBus,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl RankingEngine {
    /// Create an empty engine; `event_capacity` sizes the event channel
    pub fn new(event_capacity: usize) -> Self {
        Self {
            buckets: Mutex::new(Buckets::default()),
            events: EventBus::new(event_capacity),
        }
    }

    /// Event bus carrying rank change notifications for this session
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Insert a new review and rank it within its bucket
    ///
    /// The review is appended at the least-preferred end; unless the
    /// bucket was empty, it then bubbles upward one awaited comparison at
    /// a time. Resolves with the final position only after every
    /// comparison has been answered.
    ///
    /// Fails with [`Error::DuplicateReview`] before any comparison if the
    /// id is already ranked anywhere. An oracle failure mid-bubble leaves
    /// the review at its last consistent position and propagates the
    /// error; swaps committed by earlier comparisons stay.
    pub async fn insert(
        &self,
        review: ReviewItem,
        oracle: &dyn ComparisonOracle,
    ) -> Result<usize> {
        let mut buckets = self.buckets.lock().await;
        if buckets.locate(&review.id).is_some() {
            return Err(Error::DuplicateReview(review.id));
        }

        let rating = review.rating;
        let review_id = review.id.clone();
        let bucket = buckets.bucket_mut(rating);

        let mut review = review;
        let start = bucket.len();
        review.position = start;
        bucket.push(review);
        debug!("Appended review {} to {} bucket at {}", review_id, rating, start);

        let (position, comparisons) = bubble_up(bucket, start, oracle).await?;

        info!(
            "Ranked review {} in {} bucket at position {} after {} comparisons",
            review_id, rating, position, comparisons
        );
        self.events.emit_lossy(RankEvent::ReviewInserted {
            review_id,
            rating,
            position,
            comparisons,
            timestamp: Utc::now(),
        });
        Ok(position)
    }

    /// Re-validate a review's rank after its content was edited
    ///
    /// Checks exactly one boundary instead of re-ranking the whole bucket,
    /// to bound the number of prompts a content edit can trigger:
    ///
    /// - the top review is compared once against its successor (none ⇒ no
    ///   comparison); it keeps its slot regardless of the answer, since a
    ///   win bubbles up from index 0 (a no-op) and reposition never
    ///   demotes;
    /// - any other review is compared against its predecessor and bubbles
    ///   the rest of the way up only after winning that first comparison;
    ///   a loss leaves the bucket untouched.
    ///
    /// The promote-only asymmetry is deliberate: a review whose standing
    /// fell is never pushed down past its neighbors here.
    pub async fn reposition(
        &self,
        review_id: &str,
        oracle: &dyn ComparisonOracle,
    ) -> Result<usize> {
        let mut buckets = self.buckets.lock().await;
        let (rating, index) = buckets
            .locate(review_id)
            .ok_or_else(|| Error::ReviewNotFound(review_id.to_string()))?;
        let bucket = buckets.bucket_mut(rating);

        let (position, comparisons) = if index == 0 {
            if bucket.len() < 2 {
                (0, 0)
            } else {
                let outcome = oracle.compare(&bucket[0], &bucket[1]).await?;
                // Answer validated but unused: the top slot is not ceded
                winner_is(&outcome, &bucket[0], &bucket[1])?;
                (0, 1)
            }
        } else {
            bubble_up(bucket, index, oracle).await?
        };

        info!(
            "Repositioned review {} in {} bucket: {} -> {} after {} comparisons",
            review_id, rating, index, position, comparisons
        );
        self.events.emit_lossy(RankEvent::ReviewRepositioned {
            review_id: review_id.to_string(),
            rating,
            from_position: index,
            to_position: position,
            comparisons,
            timestamp: Utc::now(),
        });
        Ok(position)
    }

    /// Remove a review, re-indexing everything below it
    ///
    /// Returns whether a review was found; removing an unknown id is a
    /// no-op returning `false`, not an error. Never consults an oracle.
    pub async fn remove(&self, review_id: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        let Some((rating, index)) = buckets.locate(review_id) else {
            return false;
        };
        let bucket = buckets.bucket_mut(rating);
        bucket.remove(index);
        reindex_from(bucket, index);

        debug!("Removed review {} from {} bucket at {}", review_id, rating, index);
        self.events.emit_lossy(RankEvent::ReviewRemoved {
            review_id: review_id.to_string(),
            rating,
            position: index,
            timestamp: Utc::now(),
        });
        true
    }

    /// Replace a review's text without touching its rank
    ///
    /// Rank re-validation after an edit is a separate, explicit
    /// [`reposition`](Self::reposition) call.
    pub async fn set_content(&self, review_id: &str, content: Option<String>) -> Result<()> {
        let mut buckets = self.buckets.lock().await;
        let (rating, index) = buckets
            .locate(review_id)
            .ok_or_else(|| Error::ReviewNotFound(review_id.to_string()))?;
        buckets.bucket_mut(rating)[index].content = content;

        self.events.emit_lossy(RankEvent::ReviewContentUpdated {
            review_id: review_id.to_string(),
            rating,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Move a review one step up or down within its bucket
    ///
    /// Manual tie ordering; no oracle involved. Moving past either end of
    /// the bucket is a no-op returning the unchanged position.
    pub async fn move_review(
        &self,
        review_id: &str,
        direction: MoveDirection,
    ) -> Result<usize> {
        let mut buckets = self.buckets.lock().await;
        let (rating, index) = buckets
            .locate(review_id)
            .ok_or_else(|| Error::ReviewNotFound(review_id.to_string()))?;
        let bucket = buckets.bucket_mut(rating);

        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < bucket.len() => index + 1,
            _ => return Ok(index),
        };
        swap_adjacent(bucket, index.max(target));

        debug!(
            "Moved review {} in {} bucket: {} -> {}",
            review_id, rating, index, target
        );
        self.events.emit_lossy(RankEvent::ReviewMoved {
            review_id: review_id.to_string(),
            rating,
            from_position: index,
            to_position: target,
            timestamp: Utc::now(),
        });
        Ok(target)
    }

    /// Replace one bucket's order with an explicit id permutation
    ///
    /// `ordered_ids` must name every review currently in the bucket
    /// exactly once, most preferred first; anything else fails with
    /// [`Error::OrderMismatch`] and leaves the bucket untouched. No oracle
    /// involved.
    pub async fn apply_order(&self, rating: Rating, ordered_ids: &[String]) -> Result<()> {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.bucket_mut(rating);
        if ordered_ids.len() != bucket.len() {
            return Err(Error::OrderMismatch(format!(
                "expected {} ids for the {} bucket, got {}",
                bucket.len(),
                rating,
                ordered_ids.len()
            )));
        }

        let mut taken = vec![false; bucket.len()];
        let mut indices = Vec::with_capacity(ordered_ids.len());
        for id in ordered_ids {
            let Some(index) = bucket
                .iter()
                .enumerate()
                .find_map(|(i, r)| (!taken[i] && r.id == *id).then_some(i))
            else {
                return Err(Error::OrderMismatch(format!(
                    "{id} is not in the {rating} bucket"
                )));
            };
            taken[index] = true;
            indices.push(index);
        }

        let mut reordered: Vec<ReviewItem> =
            indices.iter().map(|&i| bucket[i].clone()).collect();
        reindex_from(&mut reordered, 0);
        *bucket = reordered;

        info!("Applied manual order to {} bucket ({} reviews)", rating, ordered_ids.len());
        self.events.emit_lossy(RankEvent::OrderApplied {
            rating,
            review_ids: ordered_ids.to_vec(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Current order of one bucket
    ///
    /// Returns a clone; callers may inspect or discard it freely without
    /// touching engine state.
    pub async fn ranking(&self, rating: Rating) -> Vec<ReviewItem> {
        self.buckets.lock().await.bucket(rating).clone()
    }

    /// Snapshot of all three buckets
    pub async fn all_rankings(&self) -> Rankings {
        let buckets = self.buckets.lock().await;
        Rankings {
            good: buckets.good.clone(),
            okay: buckets.okay.clone(),
            bad: buckets.bad.clone(),
        }
    }

    /// All reviews in hierarchy order (good, then okay, then bad)
    pub async fn combined_ranking(&self) -> Vec<ReviewItem> {
        let buckets = self.buckets.lock().await;
        Rating::ALL
            .iter()
            .flat_map(|rating| buckets.bucket(*rating).iter().cloned())
            .collect()
    }

    /// Look up a single review by id
    pub async fn get(&self, review_id: &str) -> Option<ReviewItem> {
        let buckets = self.buckets.lock().await;
        buckets
            .locate(review_id)
            .map(|(rating, index)| buckets.bucket(rating)[index].clone())
    }

    /// Number of reviews in one bucket
    pub async fn len(&self, rating: Rating) -> usize {
        self.buckets.lock().await.bucket(rating).len()
    }

    /// Total reviews across all buckets
    pub async fn total(&self) -> usize {
        let buckets = self.buckets.lock().await;
        Rating::ALL.iter().map(|r| buckets.bucket(*r).len()).sum()
    }

    /// True when no bucket holds any review
    pub async fn is_empty(&self) -> bool {
        self.total().await == 0
    }
}

/// Bubble the review at `index` upward until it loses or tops its bucket
///
/// Each iteration issues one awaited comparison against the immediate
/// predecessor; a win swaps the pair and continues, a loss stops. Returns
/// the final index and the number of comparisons issued. An oracle error
/// aborts between comparisons, so every already-committed swap (and the
/// position invariant) survives it.
async fn bubble_up(
    bucket: &mut [ReviewItem],
    mut index: usize,
    oracle: &dyn ComparisonOracle,
) -> Result<(usize, u32)> {
    let mut comparisons = 0u32;
    while index > 0 {
        let outcome = oracle.compare(&bucket[index], &bucket[index - 1]).await?;
        comparisons += 1;
        if !winner_is(&outcome, &bucket[index], &bucket[index - 1])? {
            break;
        }
        swap_adjacent(bucket, index);
        index -= 1;
    }
    Ok((index, comparisons))
}

/// True when `candidate` won the comparison
///
/// A winner id naming neither compared review is rejected outright rather
/// than silently read as a loss: it means the oracle answered a different
/// pair than the one on screen.
fn winner_is(outcome: &Comparison, candidate: &ReviewItem, other: &ReviewItem) -> Result<bool> {
    if outcome.winner_id == candidate.id {
        Ok(true)
    } else if outcome.winner_id == other.id {
        Ok(false)
    } else {
        Err(Error::OracleResponse {
            winner_id: outcome.winner_id.clone(),
            left_id: candidate.id.clone(),
            right_id: other.id.clone(),
        })
    }
}

/// Swap the item at `index` with its predecessor and re-sync both positions
fn swap_adjacent(bucket: &mut [ReviewItem], index: usize) {
    bucket.swap(index - 1, index);
    bucket[index - 1].position = index - 1;
    bucket[index].position = index;
}

/// Re-sync `position` with the storage index from `start` onward
fn reindex_from(bucket: &mut [ReviewItem], start: usize) {
    for (offset, review) in bucket[start..].iter_mut().enumerate() {
        review.position = start + offset;
    }
}
