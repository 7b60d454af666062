use serde::Serialize;

use super::types::PipelineStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Idle,
    Transcribing,
    /// Detection plus the optional re-transcription
    DetectingLanguage,
    Translating,
    Synthesizing,
    Completed,
    Failed(PipelineStep),
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed(_))
    }

    /// Legal forward edges of the run state machine.
    pub fn can_advance_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;

        if let Failed(_) = next {
            return !self.is_terminal() && self != Idle;
        }
        matches!(
            (self, next),
            (Idle, Transcribing)
                | (Transcribing, DetectingLanguage)
                | (Transcribing, Translating)
                | (DetectingLanguage, Translating)
                | (Translating, Synthesizing)
                | (Synthesizing, Completed)
        )
    }
}

/// Records the stages one run passes through.
#[derive(Debug, Clone)]
pub struct StageTracker {
    run_id: String,
    current: PipelineStage,
    visited: Vec<PipelineStage>,
}

impl StageTracker {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            current: PipelineStage::Idle,
            visited: vec![PipelineStage::Idle],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn visited(&self) -> &[PipelineStage] {
        &self.visited
    }

    pub fn into_visited(self) -> Vec<PipelineStage> {
        self.visited
    }

    pub fn advance(&mut self, next: PipelineStage) {
        if !self.current.can_advance_to(next) {
            tracing::warn!(
                "Run {}: unexpected stage transition {:?} -> {:?}",
                self.run_id,
                self.current,
                next
            );
        }
        tracing::debug!("Run {}: {:?} -> {:?}", self.run_id, self.current, next);
        self.current = next;
        self.visited.push(next);
    }
}
