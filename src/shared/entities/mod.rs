use serde::Serialize;

/// Decoded audio for a single request. After `media::normalize` the clip is
/// mono at 16 kHz.
#[derive(Clone, Debug)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Frame count (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// One classifier row: display label plus confidence as a percentage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f32,
}

/// Top-K classifier output, descending confidence. `degraded` carries the
/// placeholder note when inference was unavailable or failed; a degraded
/// result never feeds the alert decision.
#[derive(Clone, Debug, Default)]
pub struct ClassificationResult {
    pub rows: Vec<LabelScore>,
    pub degraded: Option<String>,
}

impl ClassificationResult {
    pub fn new(rows: Vec<LabelScore>) -> Self {
        Self {
            rows,
            degraded: None,
        }
    }

    pub fn degraded(note: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            degraded: Some(note.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }
}

/// Outcome of one detection pipeline run.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    pub classification: ClassificationResult,
    /// Display transcript; may be a placeholder string when recognition
    /// degraded.
    pub transcript: String,
    pub alert: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_and_duration_account_for_channels() {
        let clip = AudioClip::new(vec![0.0; 32_000], 16_000, 2);
        assert_eq!(clip.frames(), 16_000);
        assert!((clip.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degraded_result_has_no_labels() {
        let result = ClassificationResult::degraded("Model unavailable");
        assert!(result.is_degraded());
        assert!(result.labels().is_empty());
    }
}
