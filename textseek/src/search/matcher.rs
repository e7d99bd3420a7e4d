use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};

const BUFFER_CAPACITY: usize = 65536;
const UTF8_BOM: &str = "\u{feff}";

/// Finds the first line of a file that contains a literal substring.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    pattern: String,
    encoding_mode: EncodingMode,
}

impl TextMatcher {
    pub fn new(pattern: impl Into<String>, encoding_mode: EncodingMode) -> Self {
        Self {
            pattern: pattern.into(),
            encoding_mode,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn encoding_mode(&self) -> EncodingMode {
        self.encoding_mode
    }

    /// Returns the 1-based number of the first line containing the pattern.
    ///
    /// A file that cannot be opened or decoded yields `None`; the reason is
    /// logged and never propagated.
    pub fn scan(&self, path: &Path) -> Option<usize> {
        match self.first_match(path) {
            Ok(found) => found,
            Err(e) => {
                debug!("Treating {} as no match: {}", path.display(), e);
                None
            }
        }
    }

    /// Like [`scan`](Self::scan) but reports why a file could not be read.
    ///
    /// Reading stops at the first matching line. Under
    /// [`EncodingMode::FailFast`] an undecodable line before any match is an
    /// error; a match on an earlier line is still returned.
    pub fn first_match(&self, path: &Path) -> SearchResult<Option<usize>> {
        trace!("Scanning file: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);

        let mut raw = Vec::with_capacity(256);
        let mut line_number = 0;

        loop {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .map_err(|e| SearchError::from_io(path, e))?;
            if read == 0 {
                return Ok(None);
            }
            line_number += 1;

            let line = self.decode_line(&raw, path)?;
            let line = trim_line_ending(&line);
            let line = if line_number == 1 {
                line.strip_prefix(UTF8_BOM).unwrap_or(line)
            } else {
                line
            };

            if line.contains(self.pattern.as_str()) {
                trace!("Found match at line {} in {}", line_number, path.display());
                return Ok(Some(line_number));
            }
        }
    }

    fn decode_line(&self, raw: &[u8], path: &Path) -> SearchResult<String> {
        match self.encoding_mode {
            EncodingMode::FailFast => String::from_utf8(raw.to_vec())
                .map_err(|e| SearchError::encoding_error(path, e)),
            EncodingMode::Lossy => Ok(String::from_utf8_lossy(raw).into_owned()),
        }
    }
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
