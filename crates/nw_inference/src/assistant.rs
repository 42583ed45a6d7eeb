//! User-facing wrapper over an [`InferenceModel`].
//!
//! Every call returns something printable: failures are logged and replaced
//! by a fixed message or, for recommendations, by the head of the list.

use std::sync::Arc;

use nw_core::{Error, Headline, InferenceModel, Result};
use tracing::{error, info, warn};

use crate::models::create_model;
use crate::Config;

pub const UNAVAILABLE: &str = "AI service unavailable. Please check configuration.";
pub const RATE_LIMITED: &str = "AI service rate limit reached. Please wait a few minutes and try again.";
pub const AUTH_FAILED: &str =
    "AI service authentication failed. Please contact admin to check the API key configuration.";
pub const GENERIC_FAILURE: &str = "Sorry, I couldn't generate a response at this time. Please try again later.";
pub const NO_HEADLINES: &str = "No headlines provided for analysis.";
pub const NOTHING_TO_ANALYZE: &str = "No headlines to analyze";

pub const RECOMMENDATIONS: usize = 5;
pub const SENTIMENT_HEADLINES: usize = 10;

/// Message shown in place of a failed model call.
pub fn degraded_message(err: &Error) -> &'static str {
    match err {
        Error::UnexpectedStatus { status: 429, .. } => RATE_LIMITED,
        Error::UnexpectedStatus { status: 401, .. } => AUTH_FAILED,
        Error::Config(_) => UNAVAILABLE,
        _ => GENERIC_FAILURE,
    }
}

#[derive(Clone, Default)]
pub struct NewsAssistant {
    model: Option<Arc<dyn InferenceModel>>,
}

impl NewsAssistant {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model: Some(model) }
    }

    /// An assistant with no model behind it; every answer is [`UNAVAILABLE`].
    pub fn unavailable() -> Self {
        Self { model: None }
    }

    pub fn from_config(config: &Config) -> Self {
        match create_model(config) {
            Ok(model) => {
                info!("🧠 Inference model initialized (using {})", model.name());
                Self::new(model)
            }
            Err(e) => {
                warn!("Inference disabled: {}", e);
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.name())
    }

    fn settle(&self, what: &str, outcome: Result<String>) -> String {
        outcome.unwrap_or_else(|e| {
            error!("Error generating {}: {}", what, e);
            degraded_message(&e).to_string()
        })
    }

    pub async fn summarize(&self, title: &str, context: &str) -> String {
        let Some(model) = &self.model else {
            return UNAVAILABLE.to_string();
        };
        self.settle("summary", model.summarize_article(title, context).await)
    }

    /// Up to five headlines, model picks first, topped up from the head of
    /// the list. Without interests, or when the model fails, the first five.
    pub async fn recommend(&self, interests: &[String], headlines: &[Headline]) -> Vec<Headline> {
        let head = || headlines.iter().take(RECOMMENDATIONS).cloned().collect::<Vec<_>>();
        let Some(model) = &self.model else {
            return head();
        };
        if headlines.is_empty() || interests.is_empty() {
            return head();
        }

        let ranked = match model.rank_headlines(interests, headlines).await {
            Ok(ranked) => ranked,
            Err(e) => {
                error!("Error generating recommendations: {}", e);
                return head();
            }
        };

        let mut picked: Vec<usize> = Vec::with_capacity(RECOMMENDATIONS);
        for index in ranked.into_iter().chain(0..headlines.len()) {
            if picked.len() == RECOMMENDATIONS {
                break;
            }
            if index < headlines.len() && !picked.contains(&index) {
                picked.push(index);
            }
        }
        picked.into_iter().map(|i| headlines[i].clone()).collect()
    }

    /// Trends analysis. Only an empty input is an error.
    pub async fn insights(&self, headlines: &[Headline]) -> Result<String> {
        if headlines.is_empty() {
            return Err(Error::Inference(NO_HEADLINES.to_string()));
        }
        let Some(model) = &self.model else {
            return Ok(UNAVAILABLE.to_string());
        };
        Ok(self.settle("insights", model.generate_insights(headlines).await))
    }

    /// Tone of the first ten headlines.
    pub async fn sentiment(&self, headlines: &[Headline]) -> String {
        if headlines.is_empty() {
            return NOTHING_TO_ANALYZE.to_string();
        }
        let Some(model) = &self.model else {
            return UNAVAILABLE.to_string();
        };
        let sample = &headlines[..headlines.len().min(SENTIMENT_HEADLINES)];
        self.settle("sentiment analysis", model.analyze_sentiment(sample).await)
    }
}
