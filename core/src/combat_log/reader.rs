//! Whole-log reading: memory-map the file, split it into lines with
//! `memchr`, and parse each line to an [`Event`] in parallel with `rayon`.
//!
//! Parsing a line is pure and order-independent; `par_iter().map().collect()`
//! preserves line order, so the caller receives the events in file order and
//! can fold them sequentially into the session/fight state machines, which
//! require total order over the log's records.

use std::fs::File;
use std::path::Path;

use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::prelude::*;

use crate::combat_log::error::ReaderError;
use crate::combat_log::event::{Event, parse_record};
use crate::combat_log::framer::frame_line;

/// Read and parse an entire log file into an ordered list of events. Lines
/// that fail to frame (malformed header) are silently skipped, per the
/// record framer's contract.
pub fn read_log_file(path: &Path) -> Result<Vec<Event>, ReaderError> {
    let file = File::open(path).map_err(|source| ReaderError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    // SAFETY: the file is opened read-only for the duration of the mapping
    // and is not concurrently truncated by this process.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ReaderError::Mmap {
        path: path.to_path_buf(),
        source,
    })?;

    let bytes: &[u8] = &mmap;
    let mut line_ranges: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    for nl in memchr_iter(b'\n', bytes) {
        line_ranges.push((start, nl));
        start = nl + 1;
    }
    if start < bytes.len() {
        line_ranges.push((start, bytes.len()));
    }

    let events: Vec<Event> = line_ranges
        .par_iter()
        .filter_map(|&(s, e)| {
            let raw = &bytes[s..e];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            let framed = frame_line(&line)?;
            Some(parse_record(framed.rel_ms, framed.record_type, framed.remainder))
        })
        .collect();

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_events_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0,BEGIN_LOG,1700000000000,,NA,EN,10.0").unwrap();
        writeln!(file, "10,END_LOG").unwrap();
        let events = read_log_file(file.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rel_ms(), 0);
        assert_eq!(events[1].rel_ms(), 10);
    }

    #[test]
    fn skips_malformed_lines_silently() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not,a,valid,header").unwrap();
        writeln!(file, "0,BEGIN_LOG,1700000000000,,NA,EN,10.0").unwrap();
        let events = read_log_file(file.path()).unwrap();
        assert_eq!(events.len(), 1);
    }
}
