use crate::pipeline::PipelineResult;
use serde::Serialize;
use std::sync::{Arc, RwLock};

const CSV_HEADER: &str =
    "timestamp,source_language,original_text,target_language,translated_text,voice";

/// Summary row of a completed run, as displayed or exported.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub timestamp: String,
    pub source_language: String,
    pub target_language: String,
    pub original_text: String,
    pub translated_text: String,
    pub voice: String,
}

impl From<&PipelineResult> for HistoryItem {
    fn from(result: &PipelineResult) -> Self {
        Self {
            id: result.id.to_string(),
            timestamp: result.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            source_language: result.source.effective_language().to_string(),
            target_language: result.target.language_code().to_string(),
            original_text: result.original_text.clone(),
            translated_text: result.translated_text.clone(),
            voice: result.target.voice_id().to_string(),
        }
    }
}

/// Append-only log of successful runs, owned by whoever builds the pipeline.
#[derive(Default)]
pub struct RunLog {
    entries: RwLock<Vec<Arc<PipelineResult>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, result: Arc<PipelineResult>) {
        match self.entries.write() {
            Ok(mut entries) => entries.push(result),
            Err(poisoned) => poisoned.into_inner().push(result),
        }
    }

    /// Entries in display order, newest first.
    pub fn recent_first(&self) -> Vec<Arc<PipelineResult>> {
        self.snapshot().into_iter().rev().collect()
    }

    pub fn history(&self) -> Vec<HistoryItem> {
        self.recent_first()
            .iter()
            .map(|result| HistoryItem::from(result.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        tracing::info!("Run log cleared");
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for item in self.history() {
            let row = [
                item.timestamp.as_str(),
                item.source_language.as_str(),
                item.original_text.as_str(),
                item.target_language.as_str(),
                item.translated_text.as_str(),
                item.voice.as_str(),
            ]
            .iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
            out.push_str(&row);
            out.push('\n');
        }
        out
    }

    fn snapshot(&self) -> Vec<Arc<PipelineResult>> {
        match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
