//! JSON-lines persistence of record collections

use crate::error::PluginError;
use crate::record::Record;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write one plain-mapped record per line, creating parent directories
pub fn save_jsonl(path: &Path, records: &[Record]) -> Result<(), PluginError> {
    info!("Saving {} records to {}", records.len(), path.display());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, &record.to_plain()?)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read records written by [`save_jsonl`]; blank lines are skipped
pub fn load_jsonl(path: &Path) -> Result<Vec<Record>, PluginError> {
    info!("Loading records from {}", path.display());
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line).map_err(|e| {
            PluginError::InvalidInput(format!("{}:{}: {}", path.display(), line_no + 1, e))
        })?;
        records.push(Record::from_plain(value)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.jsonl");
        let records = vec![
            Record::new("http://arxiv.org/abs/1").with_title("one"),
            Record::new("http://arxiv.org/abs/2").with_title("two"),
        ];

        save_jsonl(&path, &records).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);

        let loaded = load_jsonl(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_bad_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();

        let err = load_jsonl(&path).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }
}
