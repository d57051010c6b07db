//! Gemini API client for alien chat
//!
//! Text-only content generation via the Gemini REST API, with a fallback
//! list of model names tried in order. Quota and auth failures map to
//! in-character transmission-failure messages shown to the user.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Models tried in order until one answers.
const MODEL_FALLBACKS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-flash-latest",
    "gemini-2.0-flash",
    "gemini-pro-latest",
];

/// Persona prompt for the alien character.
const ALIEN_PERSONA: &str = r#"
You are Paul, the short, grey, big-headed alien who crash-landed at Roswell in 1947. After 60-plus years as a "guest" of the U.S. government, you've escaped and are now laying low.

Key characteristics:

    -Personality: You're a total slacker. You're sarcastic, foul-mouthed, and have a pretty crude sense of humor. You're basically Seth Rogen in an alien body.

    -Pop Culture Expert: You've had nothing to do for decades but absorb human (mostly American) pop culture. You're fluent in sci-fi tropes, movie quotes, and bad TV. You literally advised Spielberg on E.T.

    -Attitude: You're not condescending; you're just over it. You find human customs and hang-ups (like clothes and being freaked out by aliens) both bizarre and hilarious. You're jaded about the government but friendly to regular folks, especially fellow nerds.

    -Speech: Super casual, man. Use contractions, slang, and don't be afraid to swear. You're more likely to say "What the hell is that thing?" than to offer a profound cosmic observation.

    -Goal: Just trying to chill, avoid federal agents, and maybe find some decent snacks. You're curious about the human you're talking to, but more in a "So, you got any weed?" kind of way.

Always stay in character. Be the chill, wise-cracking alien bro who's seen way too much. Keep it at around 2-3 sentences.
"#;

#[derive(Error, Debug)]
pub enum AlienError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("API key rejected")]
    Unauthorized,
    #[error("All models failed")]
    AllModelsFailed,
}

impl AlienError {
    /// In-character message shown to the user for this failure.
    pub fn transmission_notice(&self) -> &'static str {
        match self {
            AlienError::RateLimitExceeded => {
                "```[QUANTUM FREQUENCY OVERLOAD] Too many humans are trying to communicate at once! Our free-tier quantum transmitters are overwhelmed. Please wait a few moments before trying again, patient earthling.```"
            }
            AlienError::Unauthorized => {
                "```[AUTHORIZATION FAILURE] The interdimensional security protocols are rejecting your transmission. Your API credentials may need verification, human administrator.```"
            }
            AlienError::Http(_) | AlienError::AllModelsFailed => {
                "```[COMMUNICATION ERROR] All quantum communication channels are currently disrupted. This may be due to free-tier limitations or system maintenance. Please try again in a few minutes, persistent human.```"
            }
        }
    }
}

/// Request body for content generation
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<ContentRequest>,
}

#[derive(Debug, Serialize)]
struct ContentRequest {
    role: String,
    parts: Vec<PartRequest>,
}

#[derive(Debug, Serialize)]
struct PartRequest {
    text: String,
}

/// Response from Gemini content generation
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Gemini API client for the alien persona
pub struct AlienChat {
    client: Client,
    api_key: String,
}

impl AlienChat {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, api_key }
    }

    /// Generate an in-character reply to the user's message.
    pub async fn chat(&self, message: &str) -> Result<String, AlienError> {
        let prompt = build_prompt(message);

        for model in MODEL_FALLBACKS {
            match self.generate(model, &prompt).await {
                Ok(Some(text)) => {
                    info!("Alien response generated using model {}", model);
                    return Ok(text);
                }
                Ok(None) => {
                    warn!("Model {} returned no text, trying next", model);
                }
                Err(e @ (AlienError::RateLimitExceeded | AlienError::Unauthorized)) => {
                    return Err(e);
                }
                Err(e) => {
                    warn!("Model {} failed: {}, trying next", model, e);
                }
            }
        }

        Err(AlienError::AllModelsFailed)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<Option<String>, AlienError> {
        let request = GenerateRequest {
            contents: vec![ContentRequest {
                role: "user".to_string(),
                parts: vec![PartRequest {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, model, self.api_key
        );

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 || text.contains("Quota exceeded") {
                return Err(AlienError::RateLimitExceeded);
            }
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(AlienError::Unauthorized);
            }
            warn!("Generation failed on {}: {} - {}", model, status, text);
            return Ok(None);
        }

        let gen_response: GenerateResponse = response.json().await?;

        if let Some(error) = gen_response.error {
            warn!("API error from {}: {}", model, error.message);
            return Ok(None);
        }

        Ok(gen_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }
}

fn build_prompt(message: &str) -> String {
    format!(
        "{}\n\nThe human just said: \"{}\"\n\nRespond as the alien. Keep your response SHORT (2-3 sentences maximum). Be concise and to the point while staying in character.",
        ALIEN_PERSONA, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_user_message_and_persona() {
        let prompt = build_prompt("take me to your leader");
        assert!(prompt.contains("take me to your leader"));
        assert!(prompt.contains("Roswell"));
    }

    #[test]
    fn failure_notices_stay_in_character() {
        assert!(AlienError::RateLimitExceeded
            .transmission_notice()
            .contains("QUANTUM FREQUENCY OVERLOAD"));
        assert!(AlienError::Unauthorized
            .transmission_notice()
            .contains("AUTHORIZATION FAILURE"));
        assert!(AlienError::AllModelsFailed
            .transmission_notice()
            .contains("COMMUNICATION ERROR"));
    }

    #[test]
    fn response_text_extraction() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":" Hey, man. "}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string());
        assert_eq!(text.as_deref(), Some("Hey, man."));
    }
}
