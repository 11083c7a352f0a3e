//! `localization`: translate selected product attributes.
//!
//! fetch_product → extract_fields → build_prompt → translate → parse_results
//!
//! Translation goes through the OpenAI Responses API with a reasoning
//! model. The model is asked to label each field with `=== field ===`
//! markers, which is how its answer is split back into fields.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use super::{LocalizationResult, RunSteps, WorkflowContext};
use crate::config::TranslationConfig;
use crate::credentials::Credentials;
use crate::error::{Result, RunnerError};
use crate::subject::Subject;

const GLOSSARY_REQUIRED: &str = "glossary is required - please provide unit/abbreviation replacements (e.g., 'V → فولت\\nW → واط')";

/// Workflow input. Every field has a default; the required ones are
/// checked in [`LocalizationInput::validate`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalizationInput {
    pub target_language: String,
    /// Attribute keys or `category//key` paths.
    pub fields_to_translate: Vec<String>,
    pub transliterate_brand: bool,
    pub preserve_html: bool,
    /// Unit and abbreviation replacements, one per line.
    pub glossary: String,
    pub reasoning_effort: String,
}

impl Default for LocalizationInput {
    fn default() -> Self {
        Self {
            target_language: "Modern Standard Arabic".to_owned(),
            fields_to_translate: Vec::new(),
            transliterate_brand: true,
            preserve_html: true,
            glossary: String::new(),
            reasoning_effort: "low".to_owned(),
        }
    }
}

impl LocalizationInput {
    /// Parse run input; `null` means all defaults.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Precondition`] if the input has the wrong shape.
    pub fn parse(input: &Value) -> Result<Self> {
        if input.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(input.clone())
            .map_err(|e| RunnerError::Precondition(format!("invalid localization input: {e}")))
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Precondition`] naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.fields_to_translate.iter().all(|f| f.trim().is_empty()) {
            return Err(RunnerError::Precondition(
                "fields_to_translate is required".into(),
            ));
        }
        if self.glossary.trim().is_empty() {
            return Err(RunnerError::Precondition(GLOSSARY_REQUIRED.into()));
        }
        Ok(())
    }
}

/// Resolve each requested field against the subject, in request order.
///
/// Unresolved fields fall back to the product name (fields mentioning
/// "name") or the long description (fields mentioning "description");
/// anything else is skipped. If nothing resolves, the name is translated.
pub fn extract_fields(subject: &Subject, requested: &[String]) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for field in requested {
        if field.trim().is_empty() || fields.iter().any(|(k, _)| k == field) {
            continue;
        }
        let lower = field.to_lowercase();
        let value = subject.attribute(field).or_else(|| {
            if lower.contains("name") {
                Some(subject.name.clone())
            } else if lower.contains("description") {
                Some(
                    subject
                        .long_description
                        .clone()
                        .unwrap_or_else(|| subject.name.clone()),
                )
            } else {
                None
            }
        });
        if let Some(value) = value {
            fields.push((field.clone(), value));
        }
    }
    if fields.is_empty() {
        fields.push(("name".to_owned(), subject.name.clone()));
    }
    fields
}

/// System prompt stating the translation principles.
pub fn build_system_prompt(input: &LocalizationInput) -> String {
    let language = &input.target_language;
    let mut principles = vec![
        "Maintain exact meaning and intent of the original text".to_owned(),
        format!("Use natural, fluent {language} that reads well to native speakers"),
        "Handle technical terminology appropriately".to_owned(),
    ];
    if input.preserve_html {
        principles.push(
            "Preserve all HTML tags and structure - translate only text content between tags"
                .to_owned(),
        );
    }
    if input.transliterate_brand {
        principles.push(
            "Transliterate brand names to Arabic script letter-by-letter (e.g., Oppo → أوبو, Samsung → سامسونج, Apple → أبل)"
                .to_owned(),
        );
    }
    principles.extend([
        "Apply unit/abbreviation replacements from the glossary provided".to_owned(),
        "For Arabic translations: No English letters in translated text (except in HTML attributes and E-XXX codes)".to_owned(),
        "Preserve all numbers exactly as they appear".to_owned(),
        "For acronyms not in glossary, transliterate them letter-by-letter to Arabic script".to_owned(),
    ]);

    let mut prompt = format!(
        "You are an expert translator and localization specialist for {language}.\n\nKey principles:\n"
    );
    for (i, principle) in principles.iter().enumerate() {
        prompt.push_str(&format!("{}. {principle}\n", i + 1));
    }
    prompt.push_str(&format!(
        "\n=== GLOSSARY ===\n{}\n===\n\nReturn the translated text for each field, clearly labeled.",
        input.glossary
    ));
    prompt
}

/// User prompt listing each field under a `=== field ===` marker.
pub fn build_user_prompt(subject: &Subject, language: &str, fields: &[(String, String)]) -> String {
    let mut prompt = format!(
        "Product: {}\nBrand: {}\n\nTranslate the following to {language}:\n\n",
        subject.name, subject.brand
    );
    for (field, value) in fields {
        prompt.push_str(&format!("=== {field} ===\n{value}\n\n"));
    }
    prompt
}

/// Split the model's answer back into fields.
///
/// A single requested field takes the whole answer. Otherwise each
/// `=== label ===` line starts a new field; if no marker is found the
/// whole answer goes to the first field.
pub fn parse_translations(answer: &str, fields: &[(String, String)]) -> BTreeMap<String, String> {
    let mut translations = BTreeMap::new();
    let Some((first, _)) = fields.first() else {
        return translations;
    };
    if fields.len() == 1 {
        translations.insert(first.clone(), answer.trim().to_owned());
        return translations;
    }

    let mut current: Option<String> = None;
    let mut buffer: Vec<&str> = Vec::new();
    let mut flush = |current: &Option<String>, buffer: &mut Vec<&str>| {
        if let Some(field) = current {
            if !buffer.is_empty() {
                translations.insert(field.clone(), buffer.join("\n").trim().to_owned());
            }
        }
        buffer.clear();
    };

    for line in answer.split('\n') {
        if line.len() >= 3 && line.starts_with("===") && line.ends_with("===") {
            flush(&current, &mut buffer);
            current = Some(line.trim_matches(|c: char| c == '=' || c == ' ').trim().to_owned());
        } else if current.is_some() {
            buffer.push(line);
        }
    }
    flush(&current, &mut buffer);

    if translations.is_empty() {
        translations.insert(first.clone(), answer.trim().to_owned());
    }
    translations
}

/// OpenAI Responses API client for translation.
pub struct Translator {
    settings: TranslationConfig,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("model", &self.settings.model)
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl Translator {
    /// Create a translator from settings and an OpenAI key.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Config`] if the HTTP client cannot be built.
    pub fn new(settings: &TranslationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| RunnerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            settings: settings.clone(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Translate with the configured reasoning model.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Translation`] on transport faults, non-200 statuses
    /// (with the first 500 characters of the body) or an unreadable body.
    pub async fn translate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        reasoning_effort: &str,
    ) -> Result<String> {
        tracing::info!(model = %self.settings.model, reasoning_effort, "translating");

        let body = json!({
            "model": self.settings.model,
            "input": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "text": {"format": {"type": "text"}, "verbosity": "medium"},
            "reasoning": {"effort": reasoning_effort, "summary": "auto"},
            "tools": [],
            "store": true
        });

        let response = self
            .client
            .post(format!("{}/v1/responses", self.settings.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::Translation(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RunnerError::Translation(e.to_string()))?;

        if status != reqwest::StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "translation request rejected");
            return Err(RunnerError::Translation(
                aeo_search::http::truncate_body(&text).to_owned(),
            ));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| RunnerError::Translation(format!("invalid JSON: {e}")))?;
        let content = extract_output_text(&data);
        tracing::info!(chars = content.chars().count(), "translation received");
        Ok(content)
    }
}

/// Collect assistant `output_text` blocks from a Responses API body,
/// falling back to top-level `output_text` or `text`.
pub fn extract_output_text(data: &Value) -> String {
    let mut content = String::new();
    for item in data
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let is_assistant_message = item.get("type").and_then(Value::as_str) == Some("message")
            && item.get("role").and_then(Value::as_str) == Some("assistant");
        if !is_assistant_message {
            continue;
        }
        for block in item
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if block.get("type").and_then(Value::as_str) == Some("output_text") {
                content.push_str(block.get("text").and_then(Value::as_str).unwrap_or_default());
            }
        }
    }

    if content.is_empty() {
        if let Some(text) = ["output_text", "text"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str).filter(|s| !s.is_empty()))
        {
            content = text.to_owned();
        }
    }
    content
}

/// Run the localization workflow.
///
/// # Errors
///
/// Missing `fields_to_translate`, `glossary`, catalogue key or OpenAI key,
/// a catalogue failure, or a translation failure.
pub async fn run(
    ctx: &WorkflowContext,
    steps: &RunSteps,
    input: &Value,
) -> Result<LocalizationResult> {
    let input = LocalizationInput::parse(input)?;
    input.validate()?;
    let subjects = ctx.subject_client()?;
    let openai_key = Credentials::require(
        &ctx.credentials.openai,
        aeo_search::Provider::OpenAi.credential_var(),
    )?;
    let translator = Translator::new(&ctx.config.translation, openai_key)?;

    steps.enter("fetch_product")?;
    let subject = subjects.fetch_first().await?;

    steps.enter("extract_fields")?;
    let fields = extract_fields(&subject, &input.fields_to_translate);
    tracing::info!(count = fields.len(), "fields to translate");

    steps.enter("build_prompt")?;
    let system_prompt = build_system_prompt(&input);
    let user_prompt = build_user_prompt(&subject, &input.target_language, &fields);

    steps.enter("translate")?;
    let answer = translator
        .translate(&system_prompt, &user_prompt, &input.reasoning_effort)
        .await?;

    steps.enter("parse_results")?;
    let translated_fields = parse_translations(&answer, &fields);

    Ok(LocalizationResult {
        product_id: subject
            .identifier
            .clone()
            .unwrap_or_else(|| "unknown".to_owned()),
        product_name: subject.name,
        brand: subject.brand,
        target_language: input.target_language,
        original_fields: fields.into_iter().collect(),
        field_count: translated_fields.len(),
        translated_fields,
    })
}
