use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::dataset::{EpochConfig, ShardOrdering};
use crate::foundation::core::FIRST_RANK;
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::record::normalize::normalize;
use crate::record::schema::RecordSchema;
use crate::reorder::layout::{RawShard, ShardLayout};

/// A raw shard moved to its ranked name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankAssignment {
    /// Assigned rank.
    pub rank: u32,
    /// Stage 1 key, when ranked by first timestamp.
    pub key: Option<i64>,
    /// Source raw shard.
    pub source: RawShard,
    /// Ranked file path.
    pub ranked: PathBuf,
}

/// Two raw shards whose first events fell in the same second.
///
/// The later insertion keeps the key; the dropped shard is left untouched under its raw name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankCollision {
    /// Shared whole-second key.
    pub key: i64,
    /// Shard that kept the mapping.
    pub kept: PathBuf,
    /// Shard whose mapping was overwritten.
    pub dropped: PathBuf,
}

impl RankCollision {
    /// Express this collision as a [`PlaceError::ShardRankCollision`].
    pub fn to_error(&self) -> PlaceError {
        PlaceError::ShardRankCollision {
            key: self.key,
            kept: self.kept.display().to_string(),
            dropped: self.dropped.display().to_string(),
        }
    }
}

/// Outcome of Stage 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankReport {
    /// Shards ranked, ascending by rank.
    pub assignments: Vec<RankAssignment>,
    /// Key collisions (documented data loss).
    pub collisions: Vec<RankCollision>,
    /// Shards without a single normalizable line.
    pub unranked: Vec<PathBuf>,
}

impl RankReport {
    /// Fail with the first collision, for callers that refuse silent data loss.
    pub fn ensure_no_collisions(&self) -> PlaceResult<()> {
        match self.collisions.first() {
            Some(c) => Err(c.to_error()),
            None => Ok(()),
        }
    }
}

/// Stage 1 key of a shard: whole-second time of its first normalizable line minus `reference`.
///
/// Returns `None` when no line normalizes.
pub fn first_event_key(
    schema: &RecordSchema,
    path: &Path,
    reference_second: i64,
) -> PlaceResult<Option<i64>> {
    let f = File::open(path).with_context(|| format!("open raw shard '{}'", path.display()))?;
    let mut reader = BufReader::new(f);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("read raw shard '{}'", path.display()))?;
        if n == 0 {
            return Ok(None);
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            continue;
        };
        match normalize(schema, line) {
            Ok(ev) => return Ok(Some(ev.timestamp.whole_second() - reference_second)),
            Err(err) => tracing::debug!(path = %path.display(), %err, "skipping unrankable line"),
        }
    }
}

/// Order keyed shards and assign consecutive ranks from [`FIRST_RANK`].
///
/// A repeated key overwrites the earlier shard's mapping and is reported as a collision.
pub fn plan_ranks(keyed: Vec<(i64, RawShard)>) -> (Vec<(u32, i64, RawShard)>, Vec<RankCollision>) {
    let mut by_key: BTreeMap<i64, RawShard> = BTreeMap::new();
    let mut collisions = Vec::new();
    for (key, shard) in keyed {
        let kept = shard.path.clone();
        if let Some(old) = by_key.insert(key, shard) {
            collisions.push(RankCollision {
                key,
                kept,
                dropped: old.path,
            });
        }
    }
    let ranked = by_key
        .into_iter()
        .zip(FIRST_RANK..)
        .map(|((key, shard), rank)| (rank, key, shard))
        .collect();
    (ranked, collisions)
}

/// Stage 1: rank every raw shard and rename it to its ranked name.
///
/// Needs the complete raw set: ranks are only stable once acquisition has finished. Fails with
/// [`PlaceError::Validation`], moving nothing, when a planned rank already has a ranked or
/// ordered shard on disk.
#[tracing::instrument(skip_all, fields(epoch = %epoch.id, shards = raw.len()))]
pub fn rank_shards(
    epoch: &EpochConfig,
    layout: &ShardLayout,
    raw: &[RawShard],
) -> PlaceResult<RankReport> {
    let mut report = RankReport::default();

    let planned: Vec<(u32, Option<i64>, RawShard)> = match epoch.ordering {
        ShardOrdering::SourceIndex => raw
            .iter()
            .map(|s| (FIRST_RANK + s.index, None, s.clone()))
            .collect(),
        ShardOrdering::FirstTimestamp => {
            let mut keyed = Vec::with_capacity(raw.len());
            for shard in raw {
                match first_event_key(&epoch.schema, &shard.path, epoch.reference_second)? {
                    Some(key) => keyed.push((key, shard.clone())),
                    None => {
                        tracing::warn!(path = %shard.path.display(), "raw shard has no normalizable line; not ranked");
                        report.unranked.push(shard.path.clone());
                    }
                }
            }
            let (ranked, collisions) = plan_ranks(keyed);
            for c in &collisions {
                tracing::warn!(err = %c.to_error(), "shard mapping overwritten");
            }
            report.collisions = collisions;
            ranked
                .into_iter()
                .map(|(rank, key, shard)| (rank, Some(key), shard))
                .collect()
        }
    };

    ensure_ranks_free(layout, &planned)?;

    for (rank, key, source) in planned {
        let ranked = layout.ranked_path(rank);
        if source.path != ranked {
            std::fs::rename(&source.path, &ranked).with_context(|| {
                format!(
                    "rename '{}' to '{}'",
                    source.path.display(),
                    ranked.display()
                )
            })?;
        }
        tracing::debug!(rank, ?key, from = %source.path.display(), "ranked shard");
        report.assignments.push(RankAssignment {
            rank,
            key,
            source,
            ranked,
        });
    }
    report.assignments.sort_by_key(|a| a.rank);
    Ok(report)
}

/// Refuse the whole plan when any planned rank already has a ranked or ordered shard.
///
/// Checked before the first rename so a refused run leaves every file where it was.
fn ensure_ranks_free(
    layout: &ShardLayout,
    planned: &[(u32, Option<i64>, RawShard)],
) -> PlaceResult<()> {
    for (rank, _, source) in planned {
        let ranked = layout.ranked_path(*rank);
        let ordered = layout.ordered_path(*rank);
        let occupied = if source.path != ranked && ranked.exists() {
            Some(ranked)
        } else if source.path != ordered && ordered.exists() {
            Some(ordered)
        } else {
            None
        };
        if let Some(existing) = occupied {
            return Err(PlaceError::validation(format!(
                "rank {rank} for raw shard '{}' is already taken by '{}'; move leftover raw shards aside before re-running",
                source.path.display(),
                existing.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/reorder/rank.rs"]
mod tests;
