use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;

use crate::foundation::core::Position;
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::record::normalize::{LineStats, normalize};
use crate::record::schema::RecordSchema;

/// Bounding box of the events in one shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardExtent {
    /// Smallest x and y seen.
    pub min: Position,
    /// Largest x and y seen.
    pub max: Position,
    /// Line counters.
    pub lines: LineStats,
}

/// Scan a shard for the min/max canonical coordinates of its events.
///
/// Used to check growth-stage tables against real data. `None` when no line normalizes.
pub fn shard_extent(schema: &RecordSchema, path: &Path) -> PlaceResult<Option<ShardExtent>> {
    let f = File::open(path).with_context(|| format!("open shard '{}'", path.display()))?;
    let mut reader = BufReader::new(f);
    let mut buf = Vec::new();
    let mut lines = LineStats::default();
    let mut bounds: Option<(Position, Position)> = None;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("read shard '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        let ev = match std::str::from_utf8(&buf)
            .map_err(|e| PlaceError::malformed(e.to_string()))
            .and_then(|line| normalize(schema, line))
        {
            Ok(ev) => ev,
            Err(err) => {
                lines.reject(&err);
                continue;
            }
        };
        lines.accept();
        let p = ev.position;
        bounds = Some(match bounds {
            None => (p, p),
            Some((lo, hi)) => (
                Position::new(lo.x.min(p.x), lo.y.min(p.y)),
                Position::new(hi.x.max(p.x), hi.y.max(p.y)),
            ),
        });
    }

    Ok(bounds.map(|(min, max)| ShardExtent { min, max, lines }))
}

#[cfg(test)]
#[path = "../../tests/unit/reorder/extent.rs"]
mod tests;
