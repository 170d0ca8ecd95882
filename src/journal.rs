use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::alerts::Alert;
use crate::sources::SourceFailure;

pub const JOURNAL_SUBDIR: &str = "surveillance-bot";

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn resolve_journal_dir() -> PathBuf {
    if let Ok(raw) = std::env::var("ANALYSIS_JOURNAL_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed).join(JOURNAL_SUBDIR);
        }
    }
    PathBuf::from("journal").join(JOURNAL_SUBDIR)
}

/// Append-only JSONL journal of analysis events, rotated daily.
pub struct AnalysisJournal {
    dir: PathBuf,
    day_key: String,
    file: File,
}

impl AnalysisJournal {
    pub fn open(dir: PathBuf) -> std::io::Result<Self> {
        create_dir_all(&dir)?;
        let day_key = Utc::now().format("%Y-%m-%d").to_string();
        let file = Self::open_day_file(&dir, &day_key)?;
        Ok(Self { dir, day_key, file })
    }

    fn open_day_file(dir: &Path, day_key: &str) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("analyses-{}.jsonl", day_key)))
    }

    fn rotate_if_needed(&mut self) -> std::io::Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        if today != self.day_key {
            self.file = Self::open_day_file(&self.dir, &today)?;
            self.day_key = today;
        }
        Ok(())
    }

    fn write_event(&mut self, event: serde_json::Value) {
        let result = (|| -> std::io::Result<()> {
            self.rotate_if_needed()?;
            let line = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            writeln!(self.file, "{}", line)?;
            self.file.flush()?;
            Ok(())
        })();

        if let Err(e) = result {
            tracing::warn!("journal write failed: {}", e);
        }
    }

    pub fn analysis_started(&mut self, symbol: &str) {
        self.write_event(json!({
            "ts": now_iso(),
            "event": "analysis_started",
            "symbol": symbol,
        }));
    }

    pub fn analysis_complete(
        &mut self,
        analysis_id: Uuid,
        symbol: &str,
        manipulation_score: f64,
        high_signals: usize,
        alerts_recorded: usize,
    ) {
        self.write_event(json!({
            "ts": now_iso(),
            "event": "analysis_complete",
            "analysis_id": analysis_id,
            "symbol": symbol,
            "manipulation_score": manipulation_score,
            "high_signals": high_signals,
            "alerts": alerts_recorded,
        }));
    }

    pub fn judgment_failure(&mut self, symbol: &str, failure: &SourceFailure) {
        self.write_event(json!({
            "ts": now_iso(),
            "event": "judgment_failure",
            "symbol": symbol,
            "source": failure.source,
            "error": failure.error,
        }));
    }

    pub fn alert_recorded(&mut self, alert: &Alert) {
        self.write_event(json!({
            "ts": now_iso(),
            "event": "alert",
            "symbol": alert.symbol,
            "kind": alert.kind,
            "priority": alert.priority,
            "message": alert.message,
        }));
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
