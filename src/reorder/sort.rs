use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{PlaceError, PlaceResult};
use crate::record::normalize::decode_payload;
use crate::record::schema::RecordSchema;
use crate::record::timestamp::Timestamp;

/// Outcome of Stage 2 for one shard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortReport {
    /// Lines read.
    pub lines_total: u64,
    /// Lines written to the ordered shard.
    pub kept: u64,
    /// Lines dropped for failing field validation.
    pub dropped_malformed: u64,
    /// Lines dropped because not even the whole seconds parsed.
    pub dropped_timestamp: u64,
    /// Kept lines whose fraction was truncated or defaulted to zero.
    pub recovered_fraction: u64,
}

impl SortReport {
    /// Lines dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped_malformed + self.dropped_timestamp
    }
}

/// Stable-sort the lines of one shard by full timestamp.
///
/// Every kept line ends with exactly one `\n`; equal timestamps keep their input order, so
/// sorting already-ordered text returns it unchanged.
pub fn sort_lines(schema: &RecordSchema, input: &str) -> (String, SortReport) {
    let mut report = SortReport::default();
    let keyed = keyed_lines(
        schema,
        input.split_inclusive('\n').map(str::as_bytes),
        &mut report,
    );

    let mut out = String::with_capacity(input.len() + 1);
    for (_, line) in keyed {
        out.push_str(line);
        out.push('\n');
    }
    (out, report)
}

/// [`sort_lines`] over raw shard bytes.
///
/// Lines that are not valid UTF-8 are dropped as malformed; kept lines are copied byte for byte.
pub fn sort_bytes(schema: &RecordSchema, input: &[u8]) -> (Vec<u8>, SortReport) {
    let mut report = SortReport::default();
    let keyed = keyed_lines(
        schema,
        input.split_inclusive(|&b| b == b'\n'),
        &mut report,
    );

    let mut out = Vec::with_capacity(input.len() + 1);
    for (_, line) in keyed {
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    (out, report)
}

fn keyed_lines<'a>(
    schema: &RecordSchema,
    raw_lines: impl Iterator<Item = &'a [u8]>,
    report: &mut SortReport,
) -> Vec<(Timestamp, &'a str)> {
    let mut keyed: Vec<(Timestamp, &'a str)> = Vec::new();

    for raw in raw_lines {
        report.lines_total += 1;
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let line = match std::str::from_utf8(raw) {
            Ok(l) => l,
            Err(err) => {
                tracing::debug!(%err, line = %String::from_utf8_lossy(raw), "dropping line from sort");
                report.dropped_malformed += 1;
                continue;
            }
        };

        let fields = match schema.split(line) {
            Ok(f) => f,
            Err(err) => {
                tracing::debug!(%err, line, "dropping line from sort");
                report.dropped_malformed += 1;
                continue;
            }
        };
        if let Err(err) = decode_payload(schema, &fields) {
            tracing::debug!(%err, line, "dropping line from sort");
            report.dropped_malformed += 1;
            continue;
        }
        match Timestamp::parse_lenient(fields.timestamp) {
            Ok((ts, recovered)) => {
                if recovered {
                    report.recovered_fraction += 1;
                }
                keyed.push((ts, line));
            }
            Err(err) => {
                tracing::debug!(%err, line, "dropping line from sort");
                report.dropped_timestamp += 1;
            }
        }
    }

    keyed.sort_by_key(|(ts, _)| *ts);
    report.kept = keyed.len() as u64;
    keyed
}

/// Stage 2: sort `input` into `output`, then remove `input`.
///
/// The result is written to a sibling temporary file and renamed into place, so `output` is
/// either absent or complete. `input == output` re-sorts in place; otherwise an existing
/// `output` is never replaced.
#[tracing::instrument(skip_all, fields(input = %input.display()))]
pub fn sort_shard(schema: &RecordSchema, input: &Path, output: &Path) -> PlaceResult<SortReport> {
    if input != output && output.exists() {
        return Err(PlaceError::validation(format!(
            "refusing to sort '{}' over existing ordered shard '{}'",
            input.display(),
            output.display()
        )));
    }

    let bytes = std::fs::read(input)
        .with_context(|| format!("read ranked shard '{}'", input.display()))?;
    let (sorted, report) = sort_bytes(schema, &bytes);

    let mut partial = output.as_os_str().to_owned();
    partial.push(".partial");
    let partial = std::path::PathBuf::from(partial);
    std::fs::write(&partial, &sorted)
        .with_context(|| format!("write '{}'", partial.display()))?;
    std::fs::rename(&partial, output)
        .with_context(|| format!("rename '{}' to '{}'", partial.display(), output.display()))?;
    if input != output {
        std::fs::remove_file(input)
            .with_context(|| format!("remove pre-sort shard '{}'", input.display()))?;
    }

    tracing::info!(
        output = %output.display(),
        kept = report.kept,
        dropped = report.dropped(),
        recovered_fraction = report.recovered_fraction,
        "shard sorted"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/reorder/sort.rs"]
mod tests;
