// Author, reviewer, file and directory experience
//
// For every commit, in push order, this module answers "how much has this
// author / reviewer / file / directory been touched before, in total and in
// the last 90 days", split by normal commits and backouts. The counts are
// kept in day-bucketed TemporalCounters so an arbitrarily long history costs
// bounded memory per entity.
//
// Files and directories count contributing commits rather than events: a
// commit touching dir1 and dir2, followed by a commit touching dir1, gives a
// third commit on dir1 + dir2 an experience of 2, not 3.

mod aggregator;
mod store;

pub use aggregator::{
    compute_experience_features, compute_experience_features_with, CommitExperience,
    ExperienceAggregator, ExperienceStat, ExperienceSummary,
};
pub use store::{CommitList, ExperienceCounter, ExperienceKey, ExperienceStore};
