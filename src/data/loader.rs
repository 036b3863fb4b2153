use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};

use super::model::{Record, FIELD_COUNT};
use crate::error::{LumiError, Result};

// ---------------------------------------------------------------------------
// Line policy
// ---------------------------------------------------------------------------

/// Which non-data lines a reader drops before the field-count check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinePolicy {
    /// Drop blank lines and lines starting with `#` (brilcalc `--byls` output).
    #[default]
    SkipComments,
    /// Additionally drop every line that does not start with a digit, for
    /// hand-made exports with a plain header row.
    NumericOnly,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Open a brilcalc CSV export for lazy reading.
pub fn open_records(path: &Path, policy: LinePolicy) -> Result<RecordReader<File>> {
    let file = File::open(path).map_err(|source| LumiError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(RecordReader::from_reader(
        file,
        path.display().to_string(),
        policy,
    ))
}

// ---------------------------------------------------------------------------
// RecordReader
// ---------------------------------------------------------------------------

/// Iterator over the well-formed records of one input.
///
/// Malformed lines are logged and counted, never yielded. The only item that
/// can be an `Err` is a read failure, after which the iterator is exhausted.
pub struct RecordReader<R> {
    inner: csv::Reader<R>,
    origin: String,
    policy: LinePolicy,
    malformed: usize,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    /// `origin` names the input in diagnostics (usually its path).
    pub fn from_reader(reader: R, origin: impl Into<String>, policy: LinePolicy) -> Self {
        let inner = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(reader);
        Self {
            inner,
            origin: origin.into(),
            policy,
            malformed: 0,
            done: false,
        }
    }

    /// Lines rejected so far.
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut fields = StringRecord::new();
            match self.inner.read_record(&mut fields) {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(err) if err.is_io_error() => {
                    self.done = true;
                    return Some(Err(LumiError::Read {
                        origin: self.origin.clone(),
                        source: err,
                    }));
                }
                Err(err) => {
                    warn!("Malformed line in csv file {}: {err}", self.origin);
                    self.malformed += 1;
                    continue;
                }
            }

            let line = fields.position().map_or(0, |p| p.line());

            if self.policy == LinePolicy::NumericOnly && !starts_with_digit(&fields) {
                debug!("{}:{line}: skipping non-numeric line", self.origin);
                continue;
            }

            // A trailing comma does not open another field.
            if fields.len() > 1 && fields.get(fields.len() - 1) == Some("") {
                fields.truncate(fields.len() - 1);
            }

            if fields.len() != FIELD_COUNT {
                let raw: Vec<&str> = fields.iter().collect();
                warn!(
                    "Malformed line in csv file {}:{line}: {}",
                    self.origin,
                    raw.join(",")
                );
                self.malformed += 1;
                continue;
            }
            if let Some(record) = Record::from_fields(line, fields) {
                return Some(Ok(record));
            }
        }
    }
}

fn starts_with_digit(fields: &StringRecord) -> bool {
    fields
        .get(0)
        .and_then(|f| f.bytes().next())
        .is_some_and(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BYLS: &str = "\
#Data tag : 18v1 , Norm tag: hfet18PAS
#run:fill,ls,time,beamstatus,E(GeV),delivered(hz/ub),recorded(hz/ub),avgpu,source
318982:6868,7:7,1530000000,STABLE BEAMS,6500,8.1,7.9,40.1,HFET

318982:6868,8:8,1530000023,STABLE BEAMS,6500,8.2,8.0,40.3,HFET
this,line,is,short
318982:6868,9:9,1530000046,STABLE BEAMS,6500,8.3,8.1,40.5,HFET
#Summary:
";

    fn read_all(text: &str, policy: LinePolicy) -> (Vec<Record>, usize) {
        let mut reader = RecordReader::from_reader(text.as_bytes(), "test.csv", policy);
        let records = reader.by_ref().collect::<Result<Vec<_>>>().unwrap();
        (records, reader.malformed())
    }

    #[test]
    fn comments_and_blank_lines_never_become_records() {
        let (records, malformed) = read_all(BYLS, LinePolicy::SkipComments);
        let ls: Vec<String> = records.iter().map(|r| r.key().ls_range).collect();
        assert_eq!(ls, ["7:7", "8:8", "9:9"]);
        assert_eq!(malformed, 1);
    }

    #[test]
    fn numeric_only_skips_header_rows() {
        let text = "name,intlumi,a,b,c,d,e,eff,err\n\
                    1,97.5,0,0,0,0,0,0.93,0.01\n\
                    2,120.0,0,0,0,0,0,0.91,0.01\n";
        let (records, malformed) = read_all(text, LinePolicy::NumericOnly);
        assert_eq!(records.len(), 2);
        assert_eq!(malformed, 0);

        let (records, _) = read_all(text, LinePolicy::SkipComments);
        assert_eq!(records.len(), 3, "header has nine fields and is kept");
    }

    #[test]
    fn crlf_input_is_accepted() {
        let text = "a:1,1:1,t,s,e,1.5,1.4,x,y\r\nb:1,2:2,t,s,e,2.5,2.4,x,y\r\n";
        let (records, malformed) = read_all(text, LinePolicy::SkipComments);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].delivered(), 2.5);
        assert_eq!(malformed, 0);
    }

    #[test]
    fn trailing_comma_does_not_add_a_field() {
        let text = "a:1,1:1,t,s,e,1.5,1.4,x,y,\n\
                    a:1,2:2,t,s,e,2.5,2.4,x,\n\
                    a:1,3:3,t,s,e,3.5,3.4,x,y\n";
        let (records, malformed) = read_all(text, LinePolicy::SkipComments);
        let ls: Vec<String> = records.iter().map(|r| r.key().ls_range).collect();
        assert_eq!(ls, ["1:1", "3:3"]);
        assert_eq!(records[0].field(8), "y");
        assert_eq!(malformed, 1);
    }

    #[test]
    fn invalid_utf8_counts_as_malformed() {
        let mut bytes = b"a:1,1:1,t,s,e,1.0,1.0,x,y\n".to_vec();
        bytes.extend_from_slice(b"a:1,\xff\xfe,t,s,e,1.0,1.0,x,y\n");
        bytes.extend_from_slice(b"a:1,3:3,t,s,e,3.0,3.0,x,y\n");
        let mut reader = RecordReader::from_reader(&bytes[..], "bytes", LinePolicy::SkipComments);
        let records = reader.by_ref().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(reader.malformed(), 1);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = open_records(Path::new("/nonexistent/6868_HFET.csv"), LinePolicy::default())
            .err()
            .expect("open must fail");
        assert!(matches!(err, LumiError::Open { .. }));
        assert!(err.to_string().contains("6868_HFET.csv"));
    }
}
