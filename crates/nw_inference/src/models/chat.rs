use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use nw_core::{Error, Headline, InferenceModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::headline_lines;
use crate::Config;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

/// Any OpenAI-compatible `/chat/completions` endpoint (Groq by default).
pub struct ChatModel {
    client: Client,
    config: Config,
}

impl ChatModel {
    pub fn new(config: Config) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(Error::Config("chat model requires an API key".to_string()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// One user turn, one reply. Non-success statuses come back as
    /// [`Error::UnexpectedStatus`] so callers can tell 429 from 401.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint();
        let request = ChatRequest {
            model: &self.config.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            stream: false,
        };

        debug!(model = %self.config.model_name, "Sending chat completion");
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Chat completion rejected");
            return Err(Error::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.json::<ChatResponse>().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| Error::Inference("model returned no choices".to_string()))
    }
}

impl fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatModel")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

/// 1-based, comma separated indices out of a free-text reply. Anything that
/// is not a number in range is ignored; repeats keep their first position.
pub fn parse_ranking(reply: &str, len: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    reply
        .split(',')
        .filter_map(|item| {
            item.trim()
                .trim_matches(|c: char| !c.is_ascii_digit())
                .parse::<usize>()
                .ok()
        })
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
        .filter(|i| seen.insert(*i))
        .collect()
}

#[async_trait]
impl InferenceModel for ChatModel {
    fn name(&self) -> &str {
        "Chat"
    }

    async fn summarize_article(&self, title: &str, context: &str) -> Result<String> {
        let prompt = format!(
            "Summarize the following news article in 3-4 sentences, focusing on the key points:\n\n\
             Title: {}\nContent: {}\n\nProvide a clear, concise summary:",
            title, context
        );
        self.complete(&prompt).await
    }

    async fn rank_headlines(&self, interests: &[String], headlines: &[Headline]) -> Result<Vec<usize>> {
        let prompt = format!(
            "Given a user interested in: {}\n\n\
             Rank these news headlines from most to least relevant to their interests:\n\n{}\n\n\
             Return only the numbers (1, 2, 3, etc.) of the top 5 most relevant articles in order of relevance.\n\
             Just provide the numbers separated by commas, like: 1, 5, 8, 3, 12",
            interests.join(", "),
            headline_lines(headlines, true)
        );
        let reply = self.complete(&prompt).await?;
        Ok(parse_ranking(&reply, headlines.len()))
    }

    async fn generate_insights(&self, headlines: &[Headline]) -> Result<String> {
        let prompt = format!(
            "Analyze these news headlines and provide insights in this exact format:\n\n{}\n\n\
             SECTION: Trending Topics\n1. [Topic Name]: [2-3 sentence explanation]\n\
             2. [Topic Name]: [2-3 sentence explanation]\n3. [Topic Name]: [2-3 sentence explanation]\n\n\
             SECTION: News Patterns\n1. [Pattern Name]: [What this indicates]\n\
             2. [Pattern Name]: [What this indicates]\n3. [Pattern Name]: [What this indicates]\n\n\
             SECTION: Notable Developments\n1. [Development]: [Why it is significant]\n\
             2. [Development]: [Why it is significant]\n\n\
             SECTION: Overall Analysis\n[2-3 paragraphs on the overall news landscape]\n\n\
             Do not use markdown, asterisks, or special formatting.",
            headline_lines(headlines, false)
        );
        self.complete(&prompt).await
    }

    async fn analyze_sentiment(&self, headlines: &[Headline]) -> Result<String> {
        let titles = headlines
            .iter()
            .map(|h| format!("• {}", h.title))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Analyze the overall sentiment of these news headlines:\n\n{}\n\n\
             Provide:\n1. Overall sentiment (positive, negative, neutral, mixed)\n\
             2. Brief explanation of the sentiment analysis\n\
             3. Key themes that influence the sentiment\n\n\
             Keep the response concise and informative.",
            titles
        );
        self.complete(&prompt).await
    }
}
