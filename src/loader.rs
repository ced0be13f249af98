// Record source: NDJSON from the HTTP stream, or from the local file when the
// stream is unusable.
use crate::error::{PrimaryFailure, ReportError, Result};
use crate::types::RawRecord;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Failure while splitting a reader into records.
#[derive(Debug)]
enum ReadError {
    Io(io::Error),
    Parse { line: usize, source: serde_json::Error },
}

impl From<ReadError> for ReportError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::Io(e) => ReportError::Io(e),
            ReadError::Parse { line, source } => ReportError::Parse { line, source },
        }
    }
}

impl From<ReadError> for PrimaryFailure {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::Io(e) => PrimaryFailure::Body(e),
            ReadError::Parse { line, source } => PrimaryFailure::Malformed { line, source },
        }
    }
}

/// Parse one record per non-blank line. The first malformed line fails the read.
fn read_records<R: BufRead>(reader: R) -> std::result::Result<Vec<RawRecord>, ReadError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(ReadError::Io)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| ReadError::Parse {
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

#[derive(Debug, Clone)]
pub struct RecordSource {
    stream_url: String,
    fallback_path: PathBuf,
    timeout: Duration,
}

impl RecordSource {
    pub fn new(stream_url: impl Into<String>, fallback_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        RecordSource {
            stream_url: stream_url.into(),
            fallback_path: fallback_path.into(),
            timeout,
        }
    }

    /// Read every record, from the stream if possible, otherwise from the file.
    ///
    /// The stream is tried once. Any [`PrimaryFailure`] switches to the local
    /// file; a failure there is returned as is.
    pub fn fetch(&self) -> Result<Vec<RawRecord>> {
        match self.fetch_primary() {
            Ok(records) => {
                info!(records = records.len(), url = %self.stream_url, "records received from stream");
                Ok(records)
            }
            Err(failure) => {
                warn!(%failure, "stream unavailable, using local file");
                let records = read_file(&self.fallback_path)?;
                info!(
                    records = records.len(),
                    path = %self.fallback_path.display(),
                    "records read from local file"
                );
                Ok(records)
            }
        }
    }

    fn fetch_primary(&self) -> std::result::Result<Vec<RawRecord>, PrimaryFailure> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client.get(&self.stream_url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PrimaryFailure::Status(status));
        }
        Ok(read_records(BufReader::new(response))?)
    }
}

/// Read an NDJSON file; a missing file or malformed line is fatal.
pub fn read_file(path: &Path) -> Result<Vec<RawRecord>> {
    let file = File::open(path)?;
    Ok(read_records(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::NamedTempFile;

    // Nothing listens on port 1, so the request fails fast.
    const DEAD_URL: &str = "http://127.0.0.1:1/api/v1/stream-data";

    fn ndjson_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    /// Answer a single request with a canned response; returns the stream URL.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let addr = listener.local_addr().expect("local addr");
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/api/v1/stream-data", addr)
    }

    fn names(records: &[RawRecord]) -> Vec<Option<&str>> {
        records.iter().map(|r| r.name.as_deref()).collect()
    }

    #[test]
    fn stream_records_are_read_when_available() {
        let url = serve_once("200 OK", "{\"name\":\"S1\"}\n\n{\"name\":\"S2\"}\n");
        let file = ndjson_file("{\"name\": \"F\"}\n");
        let source = RecordSource::new(url, file.path(), Duration::from_secs(5));
        let records = source.fetch().expect("stream should succeed");
        assert_eq!(names(&records), vec![Some("S1"), Some("S2")]);
    }

    #[test]
    fn error_status_falls_back_to_file() {
        let url = serve_once("503 Service Unavailable", "busy");
        let file = ndjson_file("{\"name\": \"F\"}\n");
        let source = RecordSource::new(url, file.path(), Duration::from_secs(5));
        let records = source.fetch().expect("fallback should succeed");
        assert_eq!(names(&records), vec![Some("F")]);

        let again = RecordSource::new(serve_once("503 Service Unavailable", "busy"), "unused", Duration::from_secs(5));
        let failure = again.fetch_primary().expect_err("status is not success");
        assert!(matches!(failure, PrimaryFailure::Status(s) if s.as_u16() == 503));
    }

    #[test]
    fn malformed_stream_line_falls_back_to_file() {
        let body = "{\"name\":\"S1\"}\n{oops\n";
        let file = ndjson_file("{\"name\": \"F\"}\n");
        let source = RecordSource::new(serve_once("200 OK", body), file.path(), Duration::from_secs(5));
        let records = source.fetch().expect("fallback should succeed");
        assert_eq!(names(&records), vec![Some("F")]);

        let again = RecordSource::new(serve_once("200 OK", body), "unused", Duration::from_secs(5));
        let failure = again.fetch_primary().expect_err("bad second line");
        assert!(matches!(failure, PrimaryFailure::Malformed { line: 2, .. }));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let input = "{\"id\": 1, \"name\": \"A\"}\n\n   \n{\"id\": 2, \"name\": \"B\"}\n";
        let records = read_records(Cursor::new(input)).expect("two records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name.as_deref(), Some("B"));
    }

    #[test]
    fn empty_input_yields_no_records() {
        let records = read_records(Cursor::new("")).expect("empty is fine");
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_line_reports_its_line_number() {
        let input = "{\"name\": \"A\"}\n{not json}\n{\"name\": \"C\"}\n";
        match read_records(Cursor::new(input)) {
            Err(ReadError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn unreachable_stream_falls_back_to_file() {
        let file = ndjson_file("{\"id\": 5, \"name\": \"Film E\"}\n");
        let source = RecordSource::new(DEAD_URL, file.path(), Duration::from_secs(2));
        let records = source.fetch().expect("fallback should succeed");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("Film E"));
    }

    #[test]
    fn missing_fallback_file_is_fatal() {
        let source = RecordSource::new(DEAD_URL, "/nonexistent/stream-data", Duration::from_secs(2));
        let err = source.fetch().expect_err("both sources unusable");
        assert!(matches!(err, ReportError::Io(_)));
    }

    #[test]
    fn malformed_fallback_file_is_fatal() {
        let file = ndjson_file("{\"name\": \"ok\"}\n[broken\n");
        let source = RecordSource::new(DEAD_URL, file.path(), Duration::from_secs(2));
        let err = source.fetch().expect_err("bad secondary line");
        assert!(matches!(err, ReportError::Parse { line: 2, .. }));
    }

    #[test]
    fn primary_failures_are_classified() {
        let source = RecordSource::new(DEAD_URL, "unused", Duration::from_secs(2));
        let failure = source.fetch_primary().expect_err("nothing listens");
        assert!(matches!(failure, PrimaryFailure::Transport(_)));

        let malformed: PrimaryFailure = read_records(Cursor::new("nope\n")).unwrap_err().into();
        assert!(matches!(malformed, PrimaryFailure::Malformed { line: 1, .. }));
    }
}
