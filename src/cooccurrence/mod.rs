// Pairwise co-failure statistics between runnables
//
// One pass over the push history counts, for every pair of runnables that
// ran together, how often both failed and how often only one did. The
// resulting support and confidence values drive redundancy reduction.

mod map;
mod miner;
mod runnable;

pub use map::{CoOccurrenceMap, PairStats, CONFIDENCE_BUCKETS};
pub use miner::{mine_cooccurrence, mine_cooccurrence_with, CoOccurrenceMiner, PairCounts};
pub use runnable::{Granularity, PushOutcome, Runnable};
