use std::sync::Arc;

use nw_core::{Error, Headline, InferenceModel, Result};

use crate::Config;

pub mod chat;
pub mod dummy;

pub use chat::ChatModel;
pub use dummy::DummyModel;

/// Build the hosted chat model. Without an API key there is nothing to talk to.
pub fn create_model(config: &Config) -> Result<Arc<dyn InferenceModel>> {
    match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(Arc::new(ChatModel::new(config.clone())?)),
        _ => Err(Error::Config("no API key configured for the inference service".to_string())),
    }
}

/// `• Title (Source: Publisher)` lines, or numbered lines when `numbered` is set.
pub(crate) fn headline_lines(headlines: &[Headline], numbered: bool) -> String {
    headlines
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if numbered {
                format!("{}. {} (Source: {})", i + 1, h.title, h.source)
            } else {
                format!("• {} (Source: {})", h.title, h.source)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headline(title: &str) -> Headline {
        Headline {
            title: title.to_string(),
            source: "Variety".to_string(),
        }
    }

    #[test]
    fn test_create_model_needs_a_key() {
        assert!(matches!(create_model(&Config::default()), Err(Error::Config(_))));
        let blank = Config::default().with_api_key("  ");
        assert!(create_model(&blank).is_err());

        let model = create_model(&Config::default().with_api_key("k")).unwrap();
        assert_eq!(model.name(), "Chat");
    }

    #[test]
    fn test_headline_lines() {
        let headlines = vec![headline("One"), headline("Two")];
        assert_eq!(
            headline_lines(&headlines, true),
            "1. One (Source: Variety)\n2. Two (Source: Variety)"
        );
        assert_eq!(headline_lines(&headlines[..1], false), "• One (Source: Variety)");
    }
}
