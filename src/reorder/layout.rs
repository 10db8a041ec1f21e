use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::config::dataset::{EpochConfig, ShardNaming};
use crate::foundation::error::PlaceResult;

/// Shard file locations for one epoch inside a data directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardLayout {
    dir: PathBuf,
    naming: ShardNaming,
}

impl ShardLayout {
    /// Layout rooted at `dir` using `naming`.
    pub fn new(dir: impl Into<PathBuf>, naming: ShardNaming) -> Self {
        Self {
            dir: dir.into(),
            naming,
        }
    }

    /// Layout for `epoch` rooted at `dir`.
    pub fn for_epoch(dir: impl Into<PathBuf>, epoch: &EpochConfig) -> Self {
        Self::new(dir, epoch.naming.clone())
    }

    /// Data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of raw source shard `index`.
    pub fn raw_path(&self, index: u32) -> PathBuf {
        let n = &self.naming;
        self.dir.join(format!(
            "{}{:0width$}{}",
            n.raw_prefix,
            index,
            n.extension,
            width = n.raw_index_width
        ))
    }

    /// Path of the ranked, unsorted shard at `rank`.
    pub fn ranked_path(&self, rank: u32) -> PathBuf {
        self.dir.join(format!(
            "{}{rank}{}",
            self.naming.ranked_prefix, self.naming.extension
        ))
    }

    /// Path of the ordered shard at `rank`.
    pub fn ordered_path(&self, rank: u32) -> PathBuf {
        self.dir.join(format!(
            "{}{rank}{}",
            self.naming.ordered_prefix, self.naming.extension
        ))
    }

    /// Ranks in `ranks` that have an ordered shard on disk. Gaps are not errors.
    pub fn ordered_ranks(&self, ranks: Range<u32>) -> Vec<u32> {
        ranks.filter(|&r| self.ordered_path(r).is_file()).collect()
    }
}

/// One raw source shard awaiting ranking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawShard {
    /// Source numbering from the export.
    pub index: u32,
    /// File location.
    pub path: PathBuf,
}

/// Supplier of raw shards that are already downloaded and decompressed.
///
/// Fetching belongs to the acquisition side; ranking only needs to know which files exist once
/// acquisition has finished.
pub trait RawShardSource {
    /// Every raw shard currently available, in any order.
    fn raw_shards(&self) -> PlaceResult<Vec<RawShard>>;
}

/// Raw shards found by probing a directory for `count` consecutive source indices.
#[derive(Clone, Debug)]
pub struct DirRawShards {
    layout: ShardLayout,
    count: u32,
}

impl DirRawShards {
    /// Probe `layout` for indices `0..count`.
    pub fn new(layout: ShardLayout, count: u32) -> Self {
        Self { layout, count }
    }

    /// Probe for every shard `epoch` declares.
    pub fn for_epoch(dir: impl Into<PathBuf>, epoch: &EpochConfig) -> Self {
        Self::new(ShardLayout::for_epoch(dir, epoch), epoch.shard_count)
    }
}

impl RawShardSource for DirRawShards {
    fn raw_shards(&self) -> PlaceResult<Vec<RawShard>> {
        Ok((0..self.count)
            .map(|index| RawShard {
                index,
                path: self.layout.raw_path(index),
            })
            .filter(|s| s.path.is_file())
            .collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reorder/layout.rs"]
mod tests;
