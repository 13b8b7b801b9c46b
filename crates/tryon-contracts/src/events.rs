use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::images::{GarmentVariant, ImageSlot};

/// Session lifecycle events. Image payloads never appear here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ImageLoaded {
        slot: ImageSlot,
        media_type: String,
        bytes: usize,
    },
    ImageFailed {
        slot: ImageSlot,
        message: String,
    },
    GenerationStarted {
        variant: GarmentVariant,
        image_parts: usize,
    },
    GenerationSucceeded {
        media_type: String,
        latency_ms: u64,
    },
    GenerationFailed {
        message: String,
        latency_ms: u64,
    },
}

/// Append-only JSONL log for one session.
///
/// Every line carries `type`, `session_id` and `ts`; the writer is cheap to
/// clone and serialises appends across clones.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event: &SessionEvent) -> anyhow::Result<Value> {
        let mut row = Map::new();
        if let Value::Object(fields) = serde_json::to_value(event)? {
            row.extend(fields);
        }
        row.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        row.insert("ts".to_string(), Value::String(now_utc_iso()));

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&row)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(row))
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use super::{EventWriter, SessionEvent};
    use crate::images::{GarmentVariant, ImageSlot};

    #[test]
    fn emit_writes_tagged_line_with_session_id() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logs").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-1");
        assert_eq!(writer.session_id(), "session-1");

        let emitted = writer.emit(&SessionEvent::ImageLoaded {
            slot: ImageSlot::Person,
            media_type: "image/png".to_string(),
            bytes: 42,
        })?;

        let content = fs::read_to_string(&path)?;
        let parsed: Value = serde_json::from_str(content.lines().next().unwrap_or(""))?;
        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], json!("image_loaded"));
        assert_eq!(parsed["slot"], json!("person"));
        assert_eq!(parsed["bytes"], json!(42));
        assert_eq!(parsed["session_id"], json!("session-1"));
        DateTime::parse_from_rfc3339(parsed["ts"].as_str().unwrap_or(""))?;
        Ok(())
    }

    #[test]
    fn emit_appends_in_order_across_clones() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-2");
        let clone = writer.clone();

        writer.emit(&SessionEvent::GenerationStarted {
            variant: GarmentVariant::TopAndBottom,
            image_parts: 3,
        })?;
        clone.emit(&SessionEvent::GenerationFailed {
            message: "boom".to_string(),
            latency_ms: 5,
        })?;

        let content = fs::read_to_string(&path)?;
        let rows: Vec<Value> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["type"], json!("generation_started"));
        assert_eq!(rows[0]["variant"], json!("top-and-bottom"));
        assert_eq!(rows[1]["type"], json!("generation_failed"));
        assert_eq!(rows[1]["message"], json!("boom"));
        Ok(())
    }
}
