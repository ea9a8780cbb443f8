use anyhow::Context as _;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::AnalyzeArgs;
use crate::library::{Library as _, LocalFsLibrary};

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let library = LocalFsLibrary::new(&args.library);
    let mut document = library
        .get(args.id)
        .await
        .context("load document")?
        .ok_or_else(|| anyhow::anyhow!("no such document: {}", args.id))?;

    let options = AnalyzeOptions {
        engine: args.engine,
        openai_base_url: args.openai_base_url,
        openai_model: args.openai_model,
        temperature: args.temperature,
    };
    let outcome = analyze(&document.title, &options).await;

    document.summary = Some(outcome.insights().summary.clone());
    library.save(&document).await.context("save document")?;

    let rendered = serde_json::to_string_pretty(&outcome).context("serialize outcome")?;
    println!("{rendered}");
    Ok(())
}

/// Presentation theme suggested by analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    Corporate,
    Modern,
    Classic,
    Creative,
    Academic,
}

impl Theme {
    /// Tolerant parse for model output; anything unrecognized becomes
    /// `Corporate` so a sloppy completion never fails the analysis.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "modern" => Self::Modern,
            "classic" => Self::Classic,
            "creative" => Self::Creative,
            "academic" => Self::Academic,
            _ => Self::Corporate,
        }
    }
}

/// Descriptive metadata for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInsights {
    pub title: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub suggested_theme: Theme,
}

/// Whether the payload came from the model or from the fixed fallback.
/// Downstream code consumes the payload either way.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Generated(DocumentInsights),
    Fallback(DocumentInsights),
}

impl AnalysisOutcome {
    pub fn insights(&self) -> &DocumentInsights {
        match self {
            Self::Generated(insights) | Self::Fallback(insights) => insights,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnalyzerEngine {
    /// No network access; always returns the fallback payload.
    Noop,
    Openai,
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub engine: AnalyzerEngine,
    pub openai_base_url: String,
    pub openai_model: String,
    pub temperature: f32,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            engine: AnalyzerEngine::Noop,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
        }
    }
}

/// Fixed payload used whenever the model cannot be reached or returns
/// something unusable. Deterministic so callers can rely on its shape.
pub fn fallback(label: &str) -> DocumentInsights {
    DocumentInsights {
        title: label.to_string(),
        summary: "This document contains valuable professional information synthesized for easy reading."
            .to_string(),
        keywords: vec![
            "document".to_string(),
            "professional".to_string(),
            "analysis".to_string(),
            "insights".to_string(),
        ],
        suggested_theme: Theme::Corporate,
    }
}

/// Produces descriptive metadata for a document label. Never fails: any
/// engine or transport problem degrades to the fallback payload.
pub async fn analyze(label: &str, options: &AnalyzeOptions) -> AnalysisOutcome {
    match options.engine {
        AnalyzerEngine::Noop => AnalysisOutcome::Fallback(fallback(label)),
        AnalyzerEngine::Openai => match analyze_via_openai(label, options).await {
            Ok(insights) => AnalysisOutcome::Generated(insights),
            Err(err) => {
                tracing::warn!(label, err = format!("{err:#}"), "analysis failed; using fallback");
                AnalysisOutcome::Fallback(fallback(label))
            }
        },
    }
}

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

const ANALYST_INSTRUCTIONS: &str = "Act as a professional librarian and content analyst. \
Given a document label, imagine its content and return a metadata package as a single JSON \
object with exactly these keys: \"title\" (string), \"summary\" (string), \"keywords\" \
(array of strings), \"suggested_theme\" (one of \"Corporate\", \"Modern\", \"Classic\", \
\"Creative\", \"Academic\"). Return only the JSON object.";

async fn analyze_via_openai(
    label: &str,
    options: &AnalyzeOptions,
) -> anyhow::Result<DocumentInsights> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
    let endpoint = responses_endpoint(&options.openai_base_url);

    tracing::info!(
        engine = "openai",
        model = %options.openai_model,
        label,
        "analyze document"
    );

    let body = serde_json::json!({
        "model": options.openai_model,
        "instructions": ANALYST_INSTRUCTIONS,
        "input": format!("Document label: {label:?}"),
        "temperature": options.temperature,
        "text": { "format": { "type": "text" } },
        "store": false,
    });

    let client = reqwest::Client::new();
    let response = client
        .post(&endpoint)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read analysis response body")?;
    if !status.is_success() {
        anyhow::bail!("analysis API error ({status}): {}", error_message(&raw));
    }

    let text = output_text(&raw).context("extract analysis output text")?;
    parse_insights(&text).context("parse analysis payload")
}

fn error_message(raw_json: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw_json)
        .ok()
        .and_then(|v| Some(v.get("error")?.get("message")?.as_str()?.to_owned()))
        .unwrap_or_else(|| raw_json.to_string())
}

/// Concatenates the `output_text` parts of an OpenAI-compatible `/responses`
/// payload.
fn output_text(raw: &str) -> anyhow::Result<String> {
    let value: serde_json::Value = serde_json::from_str(raw).context("parse responses body")?;
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `output` array in response"))?;

    let mut text = String::new();
    for item in output {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        for part in item
            .get("content")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
        {
            if part.get("type").and_then(|v| v.as_str()) == Some("output_text")
                && let Some(part_text) = part.get("text").and_then(|v| v.as_str())
            {
                text.push_str(part_text);
            }
        }
    }

    if text.trim().is_empty() {
        anyhow::bail!("analysis output text is empty");
    }
    Ok(text)
}

fn parse_insights(text: &str) -> anyhow::Result<DocumentInsights> {
    let json = strip_code_fences(text);
    let value: serde_json::Value =
        serde_json::from_str(json).context("analysis output is not JSON")?;

    let title = value
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing `title`"))?
        .to_string();
    let summary = value
        .get("summary")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing `summary`"))?
        .to_string();
    let keywords = value
        .get("keywords")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `keywords`"))?
        .iter()
        .filter_map(|k| k.as_str())
        .map(str::to_string)
        .collect::<Vec<_>>();
    let suggested_theme = value
        .get("suggested_theme")
        .or_else(|| value.get("suggestedTheme"))
        .and_then(|v| v.as_str())
        .map(Theme::parse)
        .unwrap_or(Theme::Corporate);

    Ok(DocumentInsights {
        title,
        summary,
        keywords,
        suggested_theme,
    })
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_payload_is_fixed() {
        let insights = fallback("quarterly.pdf");
        assert_eq!(insights.title, "quarterly.pdf");
        assert_eq!(
            insights.keywords,
            vec!["document", "professional", "analysis", "insights"]
        );
        assert_eq!(insights.suggested_theme, Theme::Corporate);
        assert!(!insights.summary.is_empty());
    }

    #[test]
    fn theme_parse_is_tolerant() {
        assert_eq!(Theme::parse("Modern"), Theme::Modern);
        assert_eq!(Theme::parse("  academic "), Theme::Academic);
        assert_eq!(Theme::parse("Brutalist"), Theme::Corporate);
        assert_eq!(Theme::parse(""), Theme::Corporate);
    }

    #[test]
    fn parse_insights_accepts_plain_and_fenced_json() {
        let plain = r#"{"title":"T","summary":"S","keywords":["a","b"],"suggested_theme":"Creative"}"#;
        let parsed = parse_insights(plain).unwrap();
        assert_eq!(parsed.title, "T");
        assert_eq!(parsed.suggested_theme, Theme::Creative);

        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(parse_insights(&fenced).unwrap(), parsed);
    }

    #[test]
    fn parse_insights_accepts_camel_case_theme_key() {
        let text = r#"{"title":"T","summary":"S","keywords":[],"suggestedTheme":"Classic"}"#;
        assert_eq!(parse_insights(text).unwrap().suggested_theme, Theme::Classic);
    }

    #[test]
    fn parse_insights_rejects_incomplete_payloads() {
        assert!(parse_insights("not json").is_err());
        assert!(parse_insights(r#"{"title":"T"}"#).is_err());
    }

    #[test]
    fn output_text_concatenates_message_parts() {
        let raw = r#"{"output":[
            {"type":"reasoning"},
            {"type":"message","content":[
                {"type":"output_text","text":"{\"a\":"},
                {"type":"output_text","text":"1}"}
            ]}
        ]}"#;
        assert_eq!(output_text(raw).unwrap(), "{\"a\":1}");
        assert!(output_text(r#"{"output":[]}"#).is_err());
    }

    #[tokio::test]
    async fn noop_engine_returns_the_fallback() {
        let outcome = analyze("report", &AnalyzeOptions::default()).await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.insights().title, "report");
    }
}
