use async_trait::async_trait;

use crate::types::Headline;
use crate::Result;

#[async_trait]
pub trait InferenceModel: Send + Sync {
    fn name(&self) -> &str;

    /// Summarize an article from its title and whatever body text is at hand
    async fn summarize_article(&self, title: &str, context: &str) -> Result<String>;

    /// Indices into `headlines`, most relevant first. May return fewer than asked for.
    async fn rank_headlines(&self, interests: &[String], headlines: &[Headline])
        -> Result<Vec<usize>>;

    /// Free-form trends analysis over a set of headlines
    async fn generate_insights(&self, headlines: &[Headline]) -> Result<String>;

    /// Overall tone of a set of headlines
    async fn analyze_sentiment(&self, headlines: &[Headline]) -> Result<String>;
}
