// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Intel brief synthesis.
//!
//! Sends the top headlines to a Groq-hosted model and parses the fixed
//! `SUMMARY:` / `THREATS:` / `COUNTRY_RISKS:` response format. Parsing is
//! tolerant: missing sections yield empty results and malformed risk rows
//! are skipped per-row rather than aborting.

pub mod cache;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::feeds::NewsItem;
use crate::fetch::FetchError;

const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const HEADLINE_LIMIT: usize = 40;

/// Risk score for one country, clamped to 0–100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRisk {
    pub country: String,
    pub score: u8,
    pub reason: String,
}

/// Synthesized narrative brief plus structured threat/risk lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brief {
    pub summary: String,
    #[serde(default)]
    pub key_threats: Vec<String>,
    #[serde(default)]
    pub country_risks: Vec<CountryRisk>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Calls the model to synthesize a brief from the given (already sorted)
/// headlines. An empty key or empty headline list returns an explanatory
/// placeholder brief instead of an error.
pub async fn generate_brief(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    items: &[NewsItem],
) -> Result<Brief, FetchError> {
    if api_key.is_empty() {
        return Ok(placeholder_brief(
            "No LLM API key set. Add it to ~/.config/watchtower/config.yaml to enable AI briefings.",
        ));
    }
    if items.is_empty() {
        return Ok(placeholder_brief("No news items available to summarize."));
    }

    let prompt = build_prompt(items);
    let body = json!({
        "model": model,
        "temperature": 0,
        "max_tokens": 700,
        "messages": [{"role": "user", "content": prompt}],
    });

    let response = client
        .post(GROQ_URL)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            what: "groq",
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            what: "groq",
            code: status.as_u16(),
        });
    }

    let result: ChatResponse = response.json().await.map_err(|source| FetchError::Decode {
        what: "groq",
        source,
    })?;
    let Some(choice) = result.choices.into_iter().next() else {
        return Err(FetchError::Empty { what: "groq" });
    };

    let (summary, key_threats, country_risks) = parse_brief_response(&choice.message.content);
    Ok(Brief {
        summary,
        key_threats,
        country_risks,
        generated_at: Utc::now(),
        model: result.model,
    })
}

fn placeholder_brief(summary: &str) -> Brief {
    Brief {
        summary: summary.to_owned(),
        key_threats: Vec::new(),
        country_risks: Vec::new(),
        generated_at: Utc::now(),
        model: "none".to_owned(),
    }
}

/// Builds the analyst prompt over the top headlines by severity.
pub fn build_prompt(items: &[NewsItem]) -> String {
    let mut headlines = String::new();
    for (i, item) in items.iter().take(HEADLINE_LIMIT).enumerate() {
        headlines.push_str(&format!(
            "{}. [{}] {} ({})\n",
            i + 1,
            item.severity,
            item.title,
            item.source
        ));
    }

    format!(
        "You are a geopolitical intelligence analyst. Analyze these recent headlines and respond in EXACTLY this format with no extra text:\n\
         \n\
         SUMMARY:\n\
         <3-4 sentences covering the most critical global developments right now>\n\
         \n\
         THREATS:\n\
         • <threat 1, one line>\n\
         • <threat 2, one line>\n\
         • <threat 3, one line>\n\
         • <threat 4, one line>\n\
         • <threat 5, one line>\n\
         \n\
         COUNTRY_RISKS:\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         <CountryName>|<score 0-100>|<one short reason phrase>\n\
         \n\
         Rules:\n\
         - SUMMARY: factual, analyst-toned, no fluff, max 3 sentences\n\
         - THREATS: exactly 5 bullets, one line each, most severe first\n\
         - COUNTRY_RISKS: exactly 8 countries most prominent in the news, score reflects current instability/risk (100=active war, 0=stable), pipe-separated, short reason (3-5 words max)\n\
         - No markdown, no extra formatting, no preamble\n\
         \n\
         HEADLINES:\n\
         {headlines}"
    )
}

/// Splits the model output into its fixed sections. Missing sections yield
/// empty results; malformed risk rows are skipped.
pub fn parse_brief_response(content: &str) -> (String, Vec<String>, Vec<CountryRisk>) {
    let mut sections: std::collections::HashMap<&str, String> = std::collections::HashMap::new();
    let mut current: Option<&str> = None;
    let mut buf = String::new();

    for line in content.lines() {
        match line.trim() {
            header @ ("SUMMARY:" | "THREATS:" | "COUNTRY_RISKS:") => {
                if let Some(name) = current {
                    sections.insert(name, buf.trim().to_owned());
                }
                current = Some(header.trim_end_matches(':'));
                buf.clear();
            }
            _ => {
                if current.is_some() {
                    buf.push_str(line);
                    buf.push('\n');
                }
            }
        }
    }
    if let Some(name) = current {
        sections.insert(name, buf.trim().to_owned());
    }

    let summary = sections.remove("SUMMARY").unwrap_or_default();

    let threats = sections
        .remove("THREATS")
        .unwrap_or_default()
        .lines()
        .filter_map(|line| {
            let line = line
                .trim()
                .trim_start_matches(&['•', '-', '*'][..])
                .trim()
                .to_owned();
            (!line.is_empty()).then_some(line)
        })
        .collect();

    let risks = sections
        .remove("COUNTRY_RISKS")
        .unwrap_or_default()
        .lines()
        .filter_map(parse_risk_row)
        .collect();

    (summary, threats, risks)
}

fn parse_risk_row(line: &str) -> Option<CountryRisk> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let mut parts = line.splitn(3, '|');
    let country = parts.next()?.trim();
    let score: i64 = parts.next()?.trim().parse().ok()?;
    if country.is_empty() {
        return None;
    }
    let reason = parts.next().map(str::trim).unwrap_or_default().to_owned();
    Some(CountryRisk {
        country: country.to_owned(),
        score: score.clamp(0, 100) as u8,
        reason,
    })
}
