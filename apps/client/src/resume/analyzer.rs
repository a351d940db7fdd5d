//! ATS scoring: forwards extracted resume text plus a job description to
//! the LLM and parses the structured report.

use serde::{Deserialize, Serialize};

use crate::llm_client::prompts::ATS_ANALYSIS_PROMPT;
use crate::llm_client::{LlmClient, LlmError};

/// The scored report the LLM returns. Field names follow the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsReport {
    pub match_percentage: f32,
    #[serde(default)]
    pub missing_keywords: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub ats_summary: String,
}

pub struct AtsAnalyzer {
    llm: LlmClient,
}

impl AtsAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Scores a resume against a job description. The model occasionally
    /// reports percentages outside 0 to 100; the result is clamped.
    pub async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AtsReport, LlmError> {
        let prompt = ATS_ANALYSIS_PROMPT
            .replace("{job_description}", job_description)
            .replace("{resume_text}", resume_text);

        let mut report: AtsReport = self.llm.call_json(&prompt).await?;
        report.match_percentage = report.match_percentage.clamp(0.0, 100.0);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_parses_wire_format() {
        let raw = r#"{
            "matchPercentage": 72,
            "missingKeywords": ["Kubernetes"],
            "strengths": ["**Rust** experience"],
            "improvements": ["Quantify impact"],
            "atsSummary": "Likely to pass."
        }"#;
        let report: AtsReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.match_percentage, 72.0);
        assert_eq!(report.missing_keywords, vec!["Kubernetes"]);
    }

    #[test]
    fn test_report_tolerates_missing_optional_fields() {
        let report: AtsReport = serde_json::from_str(r#"{"matchPercentage": 10}"#).unwrap();
        assert!(report.strengths.is_empty());
        assert!(report.ats_summary.is_empty());
    }

    #[test]
    fn test_prompt_substitution_fills_both_slots() {
        let prompt = ATS_ANALYSIS_PROMPT
            .replace("{job_description}", "JD TEXT")
            .replace("{resume_text}", "RESUME TEXT");
        assert!(prompt.contains("JD TEXT"));
        assert!(prompt.contains("RESUME TEXT"));
        assert!(!prompt.contains("{job_description}"));
    }
}
