//! Reading publication records from CSV, JSON and JSONL feeds.

use crate::document::RawRecord;
use crate::error::BuildError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Csv,
    Json,
    JsonLines,
}

impl InputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("csv") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            Some("jsonl") => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Read all records under `input`, a single file or a directory.
///
/// Directory entries are visited in file-name order so the resulting
/// document ids do not depend on filesystem iteration order.
pub fn read_records(input: &Path) -> Result<Vec<RawRecord>, BuildError> {
    let mut files: Vec<(PathBuf, InputFormat)> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.map_err(|e| BuildError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| input.to_path_buf()),
                source: e.into(),
            })?;
            let p = entry.path();
            if !p.is_file() { continue; }
            if let Some(format) = InputFormat::from_path(p) {
                files.push((p.to_path_buf(), format));
            } else {
                tracing::debug!(path = %p.display(), "skipping file with unsupported extension");
            }
        }
    } else if input.is_file() {
        let format = InputFormat::from_path(input)
            .ok_or_else(|| BuildError::UnsupportedInput(input.to_path_buf()))?;
        files.push((input.to_path_buf(), format));
    } else {
        return Err(BuildError::Io {
            path: input.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "input path does not exist"),
        });
    }

    let mut records = Vec::new();
    for (file, format) in files {
        let before = records.len();
        match format {
            InputFormat::Csv => read_csv(&file, &mut records)?,
            InputFormat::Json => read_json(&file, &mut records)?,
            InputFormat::JsonLines => read_jsonl(&file, &mut records)?,
        }
        tracing::debug!(path = %file.display(), records = records.len() - before, "read input file");
    }
    tracing::info!(records = records.len(), "read input records");
    Ok(records)
}

fn open(path: &Path) -> Result<File, BuildError> {
    File::open(path).map_err(|source| BuildError::Io { path: path.to_path_buf(), source })
}

/// Columns are looked up by header name. A column absent from the header
/// yields an absent field; an empty cell in a present column is an empty string.
/// Short rows are accepted and their trailing columns are absent, so the
/// invalid-record policy decides what happens to them.
fn read_csv(path: &Path, out: &mut Vec<RawRecord>) -> Result<(), BuildError> {
    let csv_err = |source| BuildError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(open(path)?);
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (title, link, authors, year, kind) =
        (column("title"), column("link"), column("authors"), column("year"), column("type"));

    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::to_string);
        out.push(RawRecord {
            title: cell(title),
            link: cell(link),
            authors: cell(authors),
            year: cell(year),
            kind: cell(kind),
        });
    }
    Ok(())
}

fn read_json(path: &Path, out: &mut Vec<RawRecord>) -> Result<(), BuildError> {
    let json_err = |source| BuildError::Json { path: path.to_path_buf(), source };
    let reader = BufReader::new(open(path)?);
    let json: serde_json::Value = serde_json::from_reader(reader).map_err(json_err)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v).map_err(json_err)?);
            }
        }
        serde_json::Value::Object(_) => out.push(serde_json::from_value(json).map_err(json_err)?),
        _ => tracing::warn!(path = %path.display(), "JSON input is neither an object nor an array, ignoring"),
    }
    Ok(())
}

fn read_jsonl(path: &Path, out: &mut Vec<RawRecord>) -> Result<(), BuildError> {
    let reader = BufReader::new(open(path)?);
    for line in reader.lines() {
        let line = line.map_err(|source| BuildError::Io { path: path.to_path_buf(), source })?;
        if line.trim().is_empty() { continue; }
        let rec: RawRecord =
            serde_json::from_str(&line).map_err(|source| BuildError::Json { path: path.to_path_buf(), source })?;
        out.push(rec);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{prepare_documents, BuildOptions, InvalidRecordPolicy};
    use std::fs;

    #[test]
    fn csv_missing_column_vs_empty_cell() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pubs.csv");
        fs::write(&p, "title,link,authors\n\"Deep Learning, Revisited\",http://a,N/A\n,http://b,\"X, Y\"\n").unwrap();
        let recs = read_records(&p).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].title.as_deref(), Some("Deep Learning, Revisited"));
        assert_eq!(recs[1].title.as_deref(), Some(""));
        assert_eq!(recs[1].authors.as_deref(), Some("X, Y"));
        assert_eq!(recs[0].year, None);
        assert_eq!(recs[0].kind, None);
    }

    #[test]
    fn json_array_object_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[{"title":"One","link":"l1","type":"Book"},{"link":"l2"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("b.jsonl"), "{\"title\":\"Three\",\"link\":\"l3\"}\n\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let recs = read_records(dir.path()).unwrap();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].kind.as_deref(), Some("Book"));
        assert_eq!(recs[1].title, None);
        assert_eq!(recs[2].title.as_deref(), Some("Three"));
    }

    #[test]
    fn rejects_unknown_file_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pubs.xml");
        fs::write(&p, "<x/>").unwrap();
        assert!(matches!(read_records(&p), Err(BuildError::UnsupportedInput(_))));
        assert!(matches!(read_records(&dir.path().join("nope.csv")), Err(BuildError::Io { .. })));
    }

    #[test]
    fn short_csv_row_is_left_to_the_record_policy() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pubs.csv");
        fs::write(&p, "title,link,authors,year,type\nGood,http://a,X,2020,Article\nTruncated Row\n").unwrap();
        let recs = read_records(&p).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].title.as_deref(), Some("Truncated Row"));
        assert_eq!(recs[1].link, None);

        let skip = BuildOptions { on_invalid: InvalidRecordPolicy::Skip, ..BuildOptions::default() };
        let docs = prepare_documents(recs.clone(), &skip).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Good");

        let err = prepare_documents(recs, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::MalformedRecord { row: 1, field: "link" }));
    }
}
