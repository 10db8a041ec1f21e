use crate::foundation::error::{PlaceError, PlaceResult};

const MAX_FIELDS: usize = 8;

/// Static per-epoch description of a raw line.
///
/// Selected by epoch id, never inferred from the line: a line either has exactly
/// `field_count` comma-separated fields or it is malformed.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordSchema {
    /// Number of comma-separated fields in a valid line.
    pub field_count: usize,
    /// Index of the timestamp field.
    pub timestamp: usize,
    /// Index of the `#RRGGBB` color field.
    pub color: usize,
    /// Index of the x coordinate field.
    pub x: usize,
    /// Index of the y coordinate field.
    pub y: usize,
    /// Constant added to every raw x coordinate.
    #[serde(default)]
    pub offset_x: i32,
    /// Constant added to every raw y coordinate.
    #[serde(default)]
    pub offset_y: i32,
}

/// Borrowed field slices of one raw line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawFields<'a> {
    /// Timestamp text.
    pub timestamp: &'a str,
    /// Color text.
    pub color: &'a str,
    /// Raw x coordinate text (may carry `"` quoting).
    pub x: &'a str,
    /// Raw y coordinate text (may carry `"` quoting).
    pub y: &'a str,
}

impl RecordSchema {
    /// 2022 export: `timestamp,user,#RRGGBB,"x,y"`.
    pub fn place_2022() -> Self {
        Self {
            field_count: 5,
            timestamp: 0,
            color: 2,
            x: 3,
            y: 4,
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// 2023 export: `timestamp,user,"x,y",#RRGGBB` with signed coordinates centered on 0.
    pub fn place_2023() -> Self {
        Self {
            field_count: 5,
            timestamp: 0,
            color: 4,
            x: 2,
            y: 3,
            offset_x: 1500,
            offset_y: 1000,
        }
    }

    pub(crate) fn validate(&self) -> PlaceResult<()> {
        if self.field_count == 0 || self.field_count > MAX_FIELDS {
            return Err(PlaceError::validation(format!(
                "schema field_count must be in 1..={MAX_FIELDS}"
            )));
        }
        let idx = [self.timestamp, self.color, self.x, self.y];
        if idx.iter().any(|&i| i >= self.field_count) {
            return Err(PlaceError::validation(
                "schema field indices must be < field_count",
            ));
        }
        for (i, a) in idx.iter().enumerate() {
            if idx[i + 1..].contains(a) {
                return Err(PlaceError::validation("schema field indices must be distinct"));
            }
        }
        Ok(())
    }

    /// Split a raw line into its schema fields.
    pub fn split<'a>(&self, line: &'a str) -> PlaceResult<RawFields<'a>> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = [""; MAX_FIELDS];
        let mut n = 0usize;
        for part in line.split(',') {
            if n < MAX_FIELDS {
                fields[n] = part;
            }
            n += 1;
        }
        if n != self.field_count {
            return Err(PlaceError::malformed(format!(
                "expected {} fields, found {n}",
                self.field_count
            )));
        }
        let field = |i: usize| {
            fields.get(i).copied().ok_or_else(|| {
                PlaceError::malformed(format!(
                    "schema reads field {i}, beyond the {MAX_FIELDS} a line may carry"
                ))
            })
        };
        Ok(RawFields {
            timestamp: field(self.timestamp)?,
            color: field(self.color)?,
            x: field(self.x)?,
            y: field(self.y)?,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/schema.rs"]
mod tests;
