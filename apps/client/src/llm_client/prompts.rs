//! Prompt templates for LLM calls.

/// ATS resume scoring prompt. `{job_description}` and `{resume_text}` are
/// substituted before the call; the model must answer with the JSON shape
/// `AtsReport` deserializes.
pub const ATS_ANALYSIS_PROMPT: &str = r#"You are an expert ATS resume analyzer. Analyze the following resume for the given job description.
Your task is to:
1. Rate the resume match on a scale of 0-100%
2. Identify missing keywords from the job description
3. Highlight strengths in the resume
4. Suggest specific improvements to better match the job description
5. Provide a brief summary of why the resume would or wouldn't pass an ATS scan

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}

Provide your analysis in the following JSON format:
{
  "matchPercentage": number,
  "missingKeywords": [string array],
  "strengths": [string array],
  "improvements": [string array],
  "atsSummary": string
}

Only return valid JSON, no other text."#;
