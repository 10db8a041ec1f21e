use rayon::prelude::*;

use crate::config::dataset::EpochConfig;
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::reorder::layout::{RawShardSource, ShardLayout};
use crate::reorder::rank::{RankReport, rank_shards};
use crate::reorder::sort::{SortReport, sort_shard};

/// Stage 2 threading options.
#[derive(Clone, Debug, Default)]
pub struct ReorderOpts {
    /// Sort shards concurrently on a dedicated rayon pool.
    pub parallel: bool,
    /// Override rayon worker threads (parallel mode only).
    pub threads: Option<usize>,
}

/// Outcome of a full offline preparation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrepareReport {
    /// Stage 1 result.
    pub rank: RankReport,
    /// Stage 2 results, ascending by rank.
    pub sorted: Vec<(u32, SortReport)>,
    /// Ranks already ordered by an earlier run.
    pub already_ordered: Vec<u32>,
}

impl PrepareReport {
    /// Lines dropped across every sorted shard.
    pub fn lines_dropped(&self) -> u64 {
        self.sorted.iter().map(|(_, r)| r.dropped()).sum()
    }
}

/// Run Stage 1 over every raw shard, then Stage 2 over every ranked shard.
///
/// Stage 1 is a barrier: no shard is sorted until all ranks are assigned. Each ranked shard is
/// sorted exactly once and removed, so only complete ordered shards remain for replay.
#[tracing::instrument(skip_all, fields(epoch = %epoch.id))]
pub fn prepare_epoch(
    epoch: &EpochConfig,
    layout: &ShardLayout,
    source: &dyn RawShardSource,
    opts: &ReorderOpts,
) -> PlaceResult<PrepareReport> {
    epoch.validate()?;
    let raw = source.raw_shards()?;
    let rank = rank_shards(epoch, layout, &raw)?;

    let mut pending = Vec::new();
    let mut already_ordered = Vec::new();
    for r in epoch.rank_range() {
        if layout.ranked_path(r).is_file() {
            pending.push(r);
        } else if layout.ordered_path(r).is_file() {
            already_ordered.push(r);
        }
    }

    let sort_one = |r: u32| -> PlaceResult<(u32, SortReport)> {
        let report = sort_shard(&epoch.schema, &layout.ranked_path(r), &layout.ordered_path(r))?;
        Ok((r, report))
    };

    let sorted: Vec<(u32, SortReport)> = if opts.parallel {
        let pool = build_thread_pool(opts.threads)?;
        pool.install(|| {
            pending
                .par_iter()
                .map(|&r| sort_one(r))
                .collect::<PlaceResult<Vec<_>>>()
        })?
    } else {
        pending.iter().map(|&r| sort_one(r)).collect::<PlaceResult<_>>()?
    };

    tracing::info!(
        ranked = rank.assignments.len(),
        collisions = rank.collisions.len(),
        sorted = sorted.len(),
        already_ordered = already_ordered.len(),
        "epoch prepared"
    );
    Ok(PrepareReport {
        rank,
        sorted,
        already_ordered,
    })
}

fn build_thread_pool(threads: Option<usize>) -> PlaceResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(PlaceError::validation(
            "reorder 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PlaceError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/reorder/prepare.rs"]
mod tests;
