use std::collections::BTreeMap;
use std::fmt;

use nw_core::{Headline, InferenceModel, Result};

/// Offline stand-in: no network, deterministic answers.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
}

#[async_trait::async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn summarize_article(&self, title: &str, context: &str) -> Result<String> {
        let text = if context.trim().is_empty() { title } else { context };
        // First 20 words
        let words: Vec<&str> = text.split_whitespace().take(20).collect();
        Ok(words.join(" "))
    }

    async fn rank_headlines(&self, interests: &[String], headlines: &[Headline]) -> Result<Vec<usize>> {
        let wanted: Vec<String> = interests.iter().flat_map(|i| words(i)).collect();
        let mut scored: Vec<(usize, usize)> = headlines
            .iter()
            .enumerate()
            .map(|(i, h)| (i, words(&h.title).filter(|w| wanted.contains(w)).count()))
            .filter(|(_, score)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(scored.into_iter().map(|(i, _)| i).take(5).collect())
    }

    async fn generate_insights(&self, headlines: &[Headline]) -> Result<String> {
        let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
        for headline in headlines {
            *per_source.entry(headline.source.as_str()).or_insert(0) += 1;
        }
        let coverage = per_source
            .iter()
            .map(|(source, n)| format!("{} ({})", source, n))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "SECTION: Overall Analysis\n{} headlines from {} sources: {}",
            headlines.len(),
            per_source.len(),
            coverage
        ))
    }

    async fn analyze_sentiment(&self, headlines: &[Headline]) -> Result<String> {
        Ok(format!("Overall sentiment: neutral ({} headlines reviewed)", headlines.len()))
    }
}
