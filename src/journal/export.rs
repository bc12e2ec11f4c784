use super::memory::{MemoryEntry, MemorySession, MemoryStore};
use super::{Cursor, JournalError, JournalSource};
use crate::filter::Scope;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

const CURSOR_FIELD: &str = "__CURSOR";

/// Reads entries from a `journalctl --output=json` export.
///
/// The export is re-read on every `open`, so an export that grows between
/// invocations behaves like a live journal.
#[derive(Debug, Clone)]
pub struct ExportSource {
    path: PathBuf,
}

impl ExportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<MemoryStore, JournalError> {
        let file = File::open(&self.path).map_err(|e| {
            JournalError::backend("open journal", format!("{}: {}", self.path.display(), e))
        })?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_number = idx + 1;
            let line = line.map_err(|e| {
                JournalError::backend("read journal", format!("{}: {}", self.path.display(), e))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_export_line(&line).map_err(|reason| {
                JournalError::backend(
                    "read journal",
                    format!("{}:{}: {}", self.path.display(), line_number, reason),
                )
            })?);
        }

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "loaded journal export");
        Ok(MemoryStore::from_entries(
            self.path.display().to_string(),
            entries,
        ))
    }
}

impl JournalSource for ExportSource {
    type Session = MemorySession;

    fn open(&self, scope: Scope) -> Result<MemorySession, JournalError> {
        if scope == Scope::LocalUser {
            tracing::debug!("export files hold a single journal; user scope has no effect");
        }
        self.load()?.open(scope)
    }
}

/// Parse one JSON object of an export into an entry
pub fn parse_export_line(line: &str) -> Result<MemoryEntry, String> {
    let object: Map<String, Value> =
        serde_json::from_str(line).map_err(|e| format!("malformed entry: {e}"))?;

    let cursor = match object.get(CURSOR_FIELD) {
        Some(Value::String(cursor)) if !cursor.is_empty() => Cursor::new(cursor.clone()),
        _ => return Err(format!("entry has no {CURSOR_FIELD} field")),
    };

    let mut entry = MemoryEntry::new(cursor);
    for (name, value) in object.iter().filter(|(name, _)| name.as_str() != CURSOR_FIELD) {
        let value = field_value(value).map_err(|reason| format!("field {name}: {reason}"))?;
        if let Some(value) = value {
            entry = entry.with_field(name.clone(), value);
        }
    }
    Ok(entry)
}

/// Strings are taken as-is, byte arrays are decoded lossily and fields that
/// occur several times in one entry keep their first value. A byte array
/// holding a value above 255 is malformed.
fn field_value(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(items) if items.iter().all(Value::is_u64) => {
            let bytes = items
                .iter()
                .filter_map(Value::as_u64)
                .map(|b| u8::try_from(b).map_err(|_| format!("byte value {b} out of range")))
                .collect::<Result<Vec<u8>, _>>()?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        Value::Array(items) => match items.first() {
            Some(first) => field_value(first),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{Advance, Journal};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_string_fields() {
        let entry = parse_export_line(
            r#"{"__CURSOR":"s=1;i=2","MESSAGE":"hello","PRIORITY":"3","_SYSTEMD_UNIT":"a.service"}"#,
        )
        .unwrap();
        assert_eq!(entry.cursor().as_str(), "s=1;i=2");
        assert_eq!(entry.get("MESSAGE"), Some("hello"));
        assert_eq!(entry.get("PRIORITY"), Some("3"));
        assert_eq!(entry.get("__CURSOR"), None);
    }

    #[test]
    fn test_parse_binary_and_repeated_fields() {
        let entry = parse_export_line(
            r#"{"__CURSOR":"c","MESSAGE":[104,105],"UNIT":["first","second"],"CODE_LINE":null}"#,
        )
        .unwrap();
        assert_eq!(entry.get("MESSAGE"), Some("hi"));
        assert_eq!(entry.get("UNIT"), Some("first"));
        assert_eq!(entry.get("CODE_LINE"), None);
    }

    #[test]
    fn test_out_of_range_byte_is_rejected() {
        let err = parse_export_line(r#"{"__CURSOR":"c","MESSAGE":[104,300]}"#).unwrap_err();
        assert!(err.contains("MESSAGE"), "unexpected error: {err}");
        assert!(err.contains("300"), "unexpected error: {err}");
    }

    #[test]
    fn test_entry_without_cursor_is_rejected() {
        assert!(parse_export_line(r#"{"MESSAGE":"hello"}"#).is_err());
        assert!(parse_export_line("not json").is_err());
        assert!(parse_export_line(r#"["array"]"#).is_err());
    }

    #[test]
    fn test_open_reads_file_each_time() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("journal.json");
        fs::write(&path, "{\"__CURSOR\":\"a\",\"MESSAGE\":\"one\"}\n\n").unwrap();

        let source = ExportSource::new(&path);
        let mut session = source.open(Scope::LocalSystem).unwrap();
        assert_eq!(session.next().unwrap(), Advance::Entry);
        assert_eq!(session.next().unwrap(), Advance::End);

        fs::write(
            &path,
            "{\"__CURSOR\":\"a\",\"MESSAGE\":\"one\"}\n{\"__CURSOR\":\"b\",\"MESSAGE\":\"two\"}\n",
        )
        .unwrap();
        let mut session = source.open(Scope::LocalSystem).unwrap();
        session.seek_cursor(&Cursor::new("a")).unwrap();
        session.next().unwrap();
        assert_eq!(session.next().unwrap(), Advance::Entry);
        assert_eq!(session.field("MESSAGE").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("journal.json");
        fs::write(&path, "{\"__CURSOR\":\"a\"}\n{\"MESSAGE\":\"x\"}\n").unwrap();

        let err = ExportSource::new(&path).load().unwrap_err();
        assert!(err.to_string().contains(":2:"), "unexpected error: {err}");
    }

    #[test]
    fn test_missing_export_is_backend_error() {
        let dir = tempdir().expect("temp dir");
        let err = ExportSource::new(dir.path().join("absent.json"))
            .load()
            .unwrap_err();
        assert!(matches!(err, JournalError::Backend { .. }));
    }
}
