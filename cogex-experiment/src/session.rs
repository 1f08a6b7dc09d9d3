use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use cogex_core::{Error, Response, Result, StimulusLevel, TrialOutcome};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

pub const RATIO_COLUMN: &str = "ratio";
pub const RESPONSE_COLUMN: &str = "response";

/// Append-only record of a session's coded outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    outcomes: Vec<TrialOutcome>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, outcome: TrialOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[TrialOutcome] {
        &self.outcomes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrialOutcome> {
        self.outcomes.iter()
    }

    /// Writes the whole log as `ratio,response` CSV.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.to_writer(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv_writer(writer)?;
        for outcome in &self.outcomes {
            wtr.serialize(outcome).map_err(csv_io)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses a session log, locating columns by header name. Any row whose
    /// ratio is not a positive number or whose response is not 0/1 fails the
    /// whole load.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = rdr.headers().map_err(|e| csv_read(e, 1))?.clone();
        let ratio_idx = column(&headers, RATIO_COLUMN)?;
        let response_idx = column(&headers, RESPONSE_COLUMN)?;

        let mut log = SessionLog::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| csv_read(e, idx + 2))?;
            let row = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            log.push(parse_row(&record, row, ratio_idx, response_idx)?);
        }
        Ok(log)
    }
}

impl FromIterator<TrialOutcome> for SessionLog {
    fn from_iter<I: IntoIterator<Item = TrialOutcome>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SessionLog {
    type Item = &'a TrialOutcome;
    type IntoIter = std::slice::Iter<'a, TrialOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

/// Appends and flushes each outcome as it arrives, so completed trials
/// survive a crash mid-session.
pub struct SessionLogWriter<W: Write = File> {
    wtr: csv::Writer<W>,
    written: usize,
}

impl SessionLogWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> SessionLogWriter<W> {
    pub fn new(writer: W) -> Result<Self> {
        Ok(Self {
            wtr: csv_writer(writer)?,
            written: 0,
        })
    }

    pub fn append(&mut self, outcome: &TrialOutcome) -> Result<()> {
        self.wtr.serialize(outcome).map_err(csv_io)?;
        self.wtr.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> Result<W> {
        self.wtr
            .into_inner()
            .map_err(|e| Error::Io(io::Error::other(e.to_string())))
    }
}

fn csv_writer<W: Write>(writer: W) -> Result<csv::Writer<W>> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record([RATIO_COLUMN, RESPONSE_COLUMN])
        .map_err(csv_io)?;
    Ok(wtr)
}

fn csv_io(e: csv::Error) -> Error {
    Error::Io(io::Error::from(e))
}

fn csv_read(e: csv::Error, fallback_row: usize) -> Error {
    if e.is_io_error() {
        return csv_io(e);
    }
    let row = e
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(fallback_row);
    Error::integrity(row, e.to_string())
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::integrity(1, format!("missing `{name}` column")))
}

fn parse_row(
    record: &StringRecord,
    row: usize,
    ratio_idx: usize,
    response_idx: usize,
) -> Result<TrialOutcome> {
    let raw_ratio = record.get(ratio_idx).unwrap_or_default();
    let ratio: f64 = raw_ratio
        .parse()
        .map_err(|_| Error::integrity(row, format!("ratio `{raw_ratio}` is not a number")))?;
    let level = StimulusLevel::new(ratio)
        .map_err(|_| Error::integrity(row, format!("ratio {ratio} is not positive")))?;

    let raw_response = record.get(response_idx).unwrap_or_default();
    let response = raw_response
        .parse::<u8>()
        .ok()
        .and_then(|v| Response::try_from(v).ok())
        .ok_or_else(|| {
            Error::integrity(row, format!("response `{raw_response}` is not 0 or 1"))
        })?;

    Ok(TrialOutcome { level, response })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::ErrorKind;

    fn outcome(ratio: f64, response: u8) -> TrialOutcome {
        TrialOutcome {
            level: StimulusLevel::new(ratio).unwrap(),
            response: Response::try_from(response).unwrap(),
        }
    }

    fn sample() -> SessionLog {
        [(1.0, 1), (0.9, 0), (1.1, 1), (0.95, 0), (1.0, 0), (1.02, 1)]
            .into_iter()
            .map(|(r, v)| outcome(r, v))
            .collect()
    }

    #[test]
    fn csv_round_trip_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");
        let log = sample();
        log.write_csv(&path).unwrap();
        let reloaded = SessionLog::read_csv(&path).unwrap();
        assert_eq!(reloaded, log);
    }

    #[test]
    fn empty_log_still_has_header() {
        let mut buf = Vec::new();
        SessionLog::new().to_writer(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "ratio,response\n");
        let reloaded = SessionLog::from_reader("ratio,response\n".as_bytes()).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn columns_are_found_by_name() {
        let data = "response,ratio\n1,0.9\n0, 1.1\n";
        let log = SessionLog::from_reader(data.as_bytes()).unwrap();
        assert_eq!(log.outcomes(), &[outcome(0.9, 1), outcome(1.1, 0)]);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let data = "trial,ratio,response,rt_ms\n0,1.05,1,412\n";
        let log = SessionLog::from_reader(data.as_bytes()).unwrap();
        assert_eq!(log.outcomes(), &[outcome(1.05, 1)]);
    }

    #[test]
    fn rejects_bad_rows_with_row_number() {
        for (data, row) in [
            ("ratio,response\n1.0,1\n1.0,2\n", 3),
            ("ratio,response\n-0.5,1\n", 2),
            ("ratio,response\n0,1\n", 2),
            ("ratio,response\nabc,1\n", 2),
            ("ratio,response\n1.0,yes\n", 2),
            ("ratio,response\n1.0,\n", 2),
        ] {
            match SessionLog::from_reader(data.as_bytes()) {
                Err(Error::InputIntegrity { row: got, .. }) => assert_eq!(got, row, "{data}"),
                other => panic!("expected integrity error for {data:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_missing_columns() {
        let err = SessionLog::from_reader("ratio,answer\n1.0,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputIntegrity);
        let err = SessionLog::from_reader("".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputIntegrity);
    }

    #[test]
    fn missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionLog::read_csv(dir.path().join("absent.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn incremental_writer_matches_single_shot() {
        let log = sample();
        let mut single = Vec::new();
        log.to_writer(&mut single).unwrap();

        let mut writer = SessionLogWriter::new(Vec::new()).unwrap();
        for outcome in &log {
            writer.append(outcome).unwrap();
        }
        assert_eq!(writer.written(), log.len());
        assert_eq!(writer.into_inner().unwrap(), single);
    }
}
