use std::ops::Range;
use std::path::Path;

use anyhow::Context;

use crate::foundation::core::{CanvasRect, FIRST_RANK};
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::record::schema::RecordSchema;

/// How Stage 1 assigns ranks to raw shards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardOrdering {
    /// Rank by each shard's first normalizable timestamp (whole seconds).
    FirstTimestamp,
    /// Source files are already chronological: rank = first rank + source index.
    SourceIndex,
}

/// File naming for one epoch's shards.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShardNaming {
    /// Prefix of raw source shards, e.g. `2022_place_canvas_history-`.
    pub raw_prefix: String,
    /// Zero-padded width of the raw source index.
    pub raw_index_width: usize,
    /// Prefix of ranked, not yet sorted shards.
    pub ranked_prefix: String,
    /// Prefix of fully ordered shards.
    pub ordered_prefix: String,
    /// Extension shared by all shard files, including the dot.
    pub extension: String,
}

/// One rectangular canvas stage, available from `rank` onward.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GrowthStage {
    /// First rank at which this canvas region exists.
    pub rank: u32,
    /// Canvas region in canonical coordinates.
    pub region: CanvasRect,
    /// Base snapshot captured at `rank`, relative to the snapshot directory.
    #[serde(default)]
    pub snapshot: Option<String>,
}

/// Geometry, encoding and shard layout of one dataset epoch.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EpochConfig {
    /// Epoch identifier, e.g. `2022`.
    pub id: String,
    /// Final canvas width.
    pub canvas_width: u32,
    /// Final canvas height.
    pub canvas_height: u32,
    /// Number of source shards.
    pub shard_count: u32,
    /// Stage 1 ranking mode.
    pub ordering: ShardOrdering,
    /// Raw line schema.
    pub schema: RecordSchema,
    /// Shard file naming.
    pub naming: ShardNaming,
    /// Unix second treated as moment zero for Stage 1 keys.
    pub reference_second: i64,
    /// Edge snapping margin used by the viewport selector.
    pub tolerance: u32,
    /// Canvas growth stages, ascending by rank.
    pub growth: Vec<GrowthStage>,
}

impl EpochConfig {
    /// Rank of the first shard.
    pub fn first_rank(&self) -> u32 {
        FIRST_RANK
    }

    /// One past the last possible rank.
    pub fn end_rank(&self) -> u32 {
        FIRST_RANK + self.shard_count
    }

    /// All ranks this epoch may contain.
    pub fn rank_range(&self) -> Range<u32> {
        self.first_rank()..self.end_rank()
    }

    /// Full final canvas.
    pub fn canvas_rect(&self) -> CanvasRect {
        CanvasRect::sized(self.canvas_width, self.canvas_height)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> PlaceResult<()> {
        let id = &self.id;
        if id.is_empty() {
            return Err(PlaceError::validation("epoch id must be non-empty"));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(PlaceError::validation(format!(
                "epoch {id}: canvas size must be non-zero"
            )));
        }
        if self.shard_count == 0 {
            return Err(PlaceError::validation(format!(
                "epoch {id}: shard_count must be > 0"
            )));
        }
        self.schema.validate()?;
        if self.naming.extension.is_empty() || self.naming.ordered_prefix.is_empty() {
            return Err(PlaceError::validation(format!(
                "epoch {id}: ordered_prefix and extension must be non-empty"
            )));
        }
        if self.naming.ranked_prefix == self.naming.ordered_prefix {
            return Err(PlaceError::validation(format!(
                "epoch {id}: ranked and ordered prefixes must differ"
            )));
        }

        let Some(first) = self.growth.first() else {
            return Err(PlaceError::validation(format!(
                "epoch {id}: growth table must have at least one stage"
            )));
        };
        if first.rank != self.first_rank() {
            return Err(PlaceError::validation(format!(
                "epoch {id}: first growth stage must start at rank {FIRST_RANK}"
            )));
        }
        let canvas = self.canvas_rect();
        for (i, stage) in self.growth.iter().enumerate() {
            stage.region.validate()?;
            if !canvas.contains_rect(stage.region) {
                return Err(PlaceError::validation(format!(
                    "epoch {id}: growth stage at rank {} exceeds the canvas",
                    stage.rank
                )));
            }
            if stage.rank >= self.end_rank() {
                return Err(PlaceError::validation(format!(
                    "epoch {id}: growth stage rank {} is past the last shard",
                    stage.rank
                )));
            }
            if i > 0 && stage.rank <= self.growth[i - 1].rank {
                return Err(PlaceError::validation(format!(
                    "epoch {id}: growth stages must be strictly ascending by rank"
                )));
            }
        }
        Ok(())
    }
}

/// Presentation parameters used to derive viewport sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DisplayConfig {
    /// Display surface width in pixels.
    pub width: u32,
    /// Display surface height in pixels.
    pub height: u32,
    /// Exclusive upper bound of the random integer display scale.
    pub max_scale: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            max_scale: 6,
        }
    }
}

/// Whole dataset: every epoch plus display defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DatasetConfig {
    /// Display parameters.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Known epochs.
    pub epochs: Vec<EpochConfig>,
}

impl DatasetConfig {
    /// Built-in tables for the 2022 and 2023 canvas-history exports.
    pub fn builtin() -> Self {
        Self {
            display: DisplayConfig::default(),
            epochs: vec![epoch_2022(), epoch_2023()],
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(s: &str) -> PlaceResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| PlaceError::validation(format!("parse dataset config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON config file.
    pub fn from_path(path: &Path) -> PlaceResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read dataset config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Pretty JSON rendering, suitable for editing and reloading.
    pub fn to_json_pretty(&self) -> PlaceResult<String> {
        Ok(serde_json::to_string_pretty(self).context("serialize dataset config")?)
    }

    /// Check every epoch and id uniqueness.
    pub fn validate(&self) -> PlaceResult<()> {
        if self.epochs.is_empty() {
            return Err(PlaceError::validation("dataset must define at least one epoch"));
        }
        if self.display.width == 0 || self.display.height == 0 || self.display.max_scale == 0 {
            return Err(PlaceError::validation(
                "display width, height and max_scale must be non-zero",
            ));
        }
        for (i, e) in self.epochs.iter().enumerate() {
            e.validate()?;
            if self.epochs[..i].iter().any(|o| o.id == e.id) {
                return Err(PlaceError::validation(format!(
                    "duplicate epoch id '{}'",
                    e.id
                )));
            }
        }
        Ok(())
    }

    /// Look up an epoch by id.
    pub fn epoch(&self, id: &str) -> PlaceResult<&EpochConfig> {
        self.epochs.iter().find(|e| e.id == id).ok_or_else(|| {
            PlaceError::validation(format!("unknown epoch '{id}'"))
        })
    }
}

fn stage(rank: u32, x0: u32, y0: u32, x1: u32, y1: u32, snapshot: Option<&str>) -> GrowthStage {
    GrowthStage {
        rank,
        region: CanvasRect { x0, y0, x1, y1 },
        snapshot: snapshot.map(str::to_owned),
    }
}

fn epoch_2022() -> EpochConfig {
    EpochConfig {
        id: "2022".to_owned(),
        canvas_width: 2000,
        canvas_height: 2000,
        shard_count: 79,
        ordering: ShardOrdering::FirstTimestamp,
        schema: RecordSchema::place_2022(),
        naming: ShardNaming {
            raw_prefix: "2022_place_canvas_history-".to_owned(),
            raw_index_width: 12,
            ranked_prefix: "Sorted_Data_".to_owned(),
            ordered_prefix: "Ordered_Data_".to_owned(),
            extension: ".csv".to_owned(),
        },
        // 2022-04-01 00:44:00 UTC
        reference_second: 1_648_773_840,
        tolerance: 40,
        growth: vec![
            stage(100, 0, 0, 1000, 1000, None),
            // 2022-04-02 16:24:56.239 UTC
            stage(113, 0, 0, 2000, 1000, Some("xBase.png")),
            // 2022-04-03 19:03:53.356 UTC
            stage(134, 0, 0, 2000, 2000, Some("yBase.png")),
        ],
    }
}

fn epoch_2023() -> EpochConfig {
    EpochConfig {
        id: "2023".to_owned(),
        canvas_width: 3000,
        canvas_height: 2000,
        shard_count: 53,
        ordering: ShardOrdering::SourceIndex,
        schema: RecordSchema::place_2023(),
        naming: ShardNaming {
            raw_prefix: "2023_place_canvas_history-".to_owned(),
            raw_index_width: 12,
            ranked_prefix: "Sorted_Data_23_".to_owned(),
            ordered_prefix: "Ordered_Data_23_".to_owned(),
            extension: ".csv".to_owned(),
        },
        // 2023-07-20 13:00:00 UTC
        reference_second: 1_689_858_000,
        tolerance: 40,
        growth: vec![
            stage(100, 1000, 500, 2000, 1500, None),
            stage(109, 1000, 500, 2500, 1500, Some("2023_109.png")),
            stage(115, 500, 500, 2500, 1500, Some("2023_115.png")),
            stage(121, 500, 0, 2500, 1500, Some("2023_121.png")),
            stage(128, 500, 0, 2500, 2000, Some("2023_128.png")),
            stage(132, 0, 0, 2500, 2000, Some("2023_132.png")),
            stage(138, 0, 0, 3000, 2000, Some("2023_138.png")),
        ],
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/dataset.rs"]
mod tests;
