/// Side channel for long-running batch runs.
///
/// Called once per finished extractor, in completion order. `articles` is the
/// cumulative record count and `sources_done` the number of extractors that have
/// finished so far, whatever their outcome.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, stage: &str, articles: usize, sources_done: usize);
}

/// Observer that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _stage: &str, _articles: usize, _sources_done: usize) {}
}
