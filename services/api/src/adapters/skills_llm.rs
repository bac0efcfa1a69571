//! services/api/src/adapters/skills_llm.rs
//!
//! This module contains the adapter for the skill helper LLM. It implements the
//! `SkillExtractionService` and `SkillMatcher` ports from the `core` crate.
//!
//! `DisabledSkills` stands in when no API key is configured; the services fall
//! back to the in-process heuristic whenever these ports fail.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use campus_core::matching::SkillMatch;
use campus_core::ports::{PortError, PortResult, SkillExtractionService, SkillMatcher};
use serde::Deserialize;

const EXTRACTION_INSTRUCTIONS: &str = "You extract professional skills from resumes. \
Respond with a JSON object of the form {\"skills\": [\"...\"]} listing technologies, tools, \
languages and frameworks mentioned in the text. Use the canonical spelling of each skill \
and do not repeat entries.";

const MATCHING_INSTRUCTIONS: &str = "You compare a candidate's skills with the skills an \
opportunity requires. Respond with a JSON object of the form \
{\"matchPercentage\": 0-100, \"matchingSkills\": [\"...\"], \"missingSkills\": [\"...\"]}. \
matchingSkills are candidate skills relevant to the opportunity; missingSkills are required \
skills the candidate lacks.";

/// Resume text beyond this many characters is not sent to the model.
const MAX_RESUME_CHARS: usize = 12_000;

#[derive(Deserialize)]
struct ExtractedSkills {
    #[serde(default)]
    skills: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchReply {
    match_percentage: f64,
    #[serde(default)]
    matching_skills: Vec<String>,
    #[serde(default)]
    missing_skills: Vec<String>,
}

impl MatchReply {
    fn into_match(self) -> SkillMatch {
        SkillMatch {
            match_percentage: self.match_percentage.clamp(0.0, 100.0).round() as u8,
            matching_skills: self.matching_skills,
            missing_skills: self.missing_skills,
        }
        .clamped()
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the skill ports using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSkillsAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSkillsAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Sends one system + user exchange and returns the raw JSON text reply.
    async fn complete_json(&self, instructions: &str, input: String) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(instructions)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(input)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .temperature(0.0)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PortError::Unexpected("Skill LLM returned no text content.".to_string()))
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl SkillExtractionService for OpenAiSkillsAdapter {
    async fn extract_skills(&self, text: &str) -> PortResult<Vec<String>> {
        let excerpt: String = text.chars().take(MAX_RESUME_CHARS).collect();
        let reply = self
            .complete_json(EXTRACTION_INSTRUCTIONS, format!("RESUME:\n{}", excerpt))
            .await?;
        parse_skills(&reply)
    }
}

#[async_trait]
impl SkillMatcher for OpenAiSkillsAdapter {
    async fn score(
        &self,
        user_skills: &[String],
        opportunity_skills: &[String],
    ) -> PortResult<SkillMatch> {
        let input = format!(
            "CANDIDATE SKILLS: {}\nREQUIRED SKILLS: {}",
            user_skills.join(", "),
            opportunity_skills.join(", ")
        );
        let reply = self.complete_json(MATCHING_INSTRUCTIONS, input).await?;
        parse_match(&reply)
    }
}

fn parse_skills(reply: &str) -> PortResult<Vec<String>> {
    serde_json::from_str::<ExtractedSkills>(reply)
        .map(|parsed| parsed.skills)
        .map_err(|e| PortError::Unexpected(format!("unparseable skill list: {}", e)))
}

fn parse_match(reply: &str) -> PortResult<SkillMatch> {
    serde_json::from_str::<MatchReply>(reply)
        .map(MatchReply::into_match)
        .map_err(|e| PortError::Unexpected(format!("unparseable match result: {}", e)))
}

//=========================================================================================
// Disabled Stand-in
//=========================================================================================

/// Used when no OpenAI key is configured.
#[derive(Clone, Default)]
pub struct DisabledSkills;

#[async_trait]
impl SkillExtractionService for DisabledSkills {
    async fn extract_skills(&self, _text: &str) -> PortResult<Vec<String>> {
        Err(PortError::Unavailable("AI skill extraction is not configured".to_string()))
    }
}

#[async_trait]
impl SkillMatcher for DisabledSkills {
    async fn score(&self, _user: &[String], _required: &[String]) -> PortResult<SkillMatch> {
        Err(PortError::Unavailable("AI skill matching is not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_scores_are_clamped() {
        let parsed = parse_match(r#"{"matchPercentage": 140, "matchingSkills": ["Rust"]}"#).unwrap();
        assert_eq!(parsed.match_percentage, 100);
        assert_eq!(parsed.matching_skills, vec!["Rust".to_string()]);
        assert!(parsed.missing_skills.is_empty());

        let parsed = parse_match(r#"{"matchPercentage": -3}"#).unwrap();
        assert_eq!(parsed.match_percentage, 0);
    }

    #[test]
    fn malformed_replies_are_errors() {
        assert!(parse_skills("not json").is_err());
        assert!(parse_match(r#"{"matchingSkills": []}"#).is_err());
        assert_eq!(
            parse_skills(r#"{"skills": ["Rust", "SQL"]}"#).unwrap(),
            vec!["Rust".to_string(), "SQL".to_string()]
        );
    }
}
