use crate::foundation::core::{Position, Rgb8};
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::record::schema::{RawFields, RecordSchema};
use crate::record::timestamp::Timestamp;

/// One pixel placement in canonical form.
///
/// Built fresh per line and never mutated; `position` already includes the epoch offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalEvent {
    /// Placement time.
    pub timestamp: Timestamp,
    /// Placed color.
    pub color: Rgb8,
    /// Canonical canvas position.
    pub position: Position,
}

/// Parse one raw line under `schema`.
///
/// Pure: the same line and schema always produce the same event or the same error kind.
pub fn normalize(schema: &RecordSchema, line: &str) -> PlaceResult<CanonicalEvent> {
    let fields = schema.split(line)?;
    let (color, position) = decode_payload(schema, &fields)?;
    let timestamp = Timestamp::parse_strict(fields.timestamp)?;
    Ok(CanonicalEvent {
        timestamp,
        color,
        position,
    })
}

/// Decode and offset everything except the timestamp.
pub(crate) fn decode_payload(
    schema: &RecordSchema,
    fields: &RawFields<'_>,
) -> PlaceResult<(Rgb8, Position)> {
    let color = Rgb8::from_hex(fields.color.trim())?;
    let x = decode_coord(fields.x, schema.offset_x, "x")?;
    let y = decode_coord(fields.y, schema.offset_y, "y")?;
    Ok((color, Position::new(x, y)))
}

fn decode_coord(raw: &str, offset: i32, axis: &str) -> PlaceResult<i32> {
    let text = raw.trim().trim_matches('"').trim();
    let v: i32 = text
        .parse()
        .map_err(|_| PlaceError::malformed(format!("{axis} coordinate \"{raw}\" is not an integer")))?;
    v.checked_add(offset)
        .ok_or_else(|| PlaceError::malformed(format!("{axis} coordinate {v} overflows with offset")))
}

/// Accepted/rejected line counters for one shard or session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Lines read.
    pub total: u64,
    /// Lines that normalized.
    pub accepted: u64,
    /// Lines rejected as [`PlaceError::MalformedRecord`].
    pub malformed: u64,
    /// Lines rejected as [`PlaceError::AmbiguousTimestamp`].
    pub ambiguous: u64,
}

impl LineStats {
    /// Count one normalized line.
    pub fn accept(&mut self) {
        self.total += 1;
        self.accepted += 1;
    }

    /// Count one rejected line by error kind.
    pub fn reject(&mut self, err: &PlaceError) {
        self.total += 1;
        match err {
            PlaceError::AmbiguousTimestamp(_) => self.ambiguous += 1,
            _ => self.malformed += 1,
        }
    }

    /// Lines rejected for any reason.
    pub fn rejected(&self) -> u64 {
        self.malformed + self.ambiguous
    }

    /// Fold another counter set into this one.
    pub fn merge(&mut self, other: &LineStats) {
        self.total += other.total;
        self.accepted += other.accepted;
        self.malformed += other.malformed;
        self.ambiguous += other.ambiguous;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/normalize.rs"]
mod tests;
