use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use nw_core::{Category, Error, RawArticle, Result, TimestampNormalizer};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::fetcher::PageFetcher;

pub mod economy;
pub mod entertainment;
pub mod lifestyle;
pub mod politics;
pub mod sports;
pub mod technology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Publisher name as stamped on records
    pub name: &'static str,
    /// Short handle used on the command line
    pub key: &'static str,
    pub category: Category,
    pub url: &'static str,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    fn source_metadata(&self) -> SourceMetadata;

    /// Fetch the listing page and lift every article block off it.
    ///
    /// An unavailable page yields an empty list. Errors are reserved for the
    /// extractor itself being broken.
    async fn extract(&self) -> Result<Vec<RawArticle>>;
}

/// How to read one value out of an article block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Whitespace-collapsed text of the first non-blank match
    Text(&'static str),
    /// Attribute of the first match carrying it
    Attr(&'static str, &'static str),
    /// Attribute on the block element itself
    BlockAttr(&'static str),
    /// Attribute of the first match that has a direct `child` element
    AttrWithChild {
        css: &'static str,
        child: &'static str,
        attr: &'static str,
    },
}

impl Field {
    fn css(&self) -> Option<&'static str> {
        match *self {
            Field::Text(css) | Field::Attr(css, _) => Some(css),
            Field::AttrWithChild { css, .. } => Some(css),
            Field::BlockAttr(_) => None,
        }
    }
}

/// Per-site extraction rules for a single listing page.
#[derive(Clone)]
pub struct SiteRule {
    pub name: &'static str,
    pub key: &'static str,
    pub category: Category,
    pub url: &'static str,
    /// Base that root-relative links are resolved against
    pub origin: &'static str,
    pub block: &'static str,
    pub title: Field,
    pub link: Field,
    pub image: Option<Field>,
    /// Tried in order; the first non-empty value wins
    pub timestamp: &'static [Field],
    /// Timestamp recovered from the raw href when the page shows none
    pub timestamp_from_link: Option<fn(&str) -> Option<String>>,
    pub rewrite_image: fn(&str) -> String,
    /// Post-filter over the finished record and the block it came from
    pub accept: fn(&RawArticle, &BlockView<'_>) -> bool,
    /// Keep only the first block for a given link
    pub unique_links: bool,
    /// Drop undated records. Runs after link dedup, so an undated first
    /// occurrence hides later dated ones.
    pub require_timestamp: bool,
}

/// How a block read on the page, before link completion.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    pub href: &'a str,
    /// Timestamp as it is written to a batch, empty when there is none
    pub display: &'a str,
}

impl SiteRule {
    pub fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: self.name,
            key: self.key,
            category: self.category,
            url: self.url,
        }
    }
}

pub(crate) fn keep_image(src: &str) -> String {
    strip_query(src).to_string()
}

pub(crate) fn accept_all(_record: &RawArticle, _block: &BlockView<'_>) -> bool {
    true
}

struct Selectors(HashMap<&'static str, Selector>);

impl Selectors {
    fn compile(rule: &SiteRule) -> Result<Self> {
        let fields = [Some(rule.title), Some(rule.link), rule.image]
            .into_iter()
            .flatten()
            .chain(rule.timestamp.iter().copied());

        let mut selectors = HashMap::new();
        for css in std::iter::once(rule.block).chain(fields.filter_map(|f| f.css())) {
            if selectors.contains_key(css) {
                continue;
            }
            let selector = Selector::parse(css)
                .map_err(|e| Error::Selector(format!("{}: {} ({})", rule.name, css, e)))?;
            selectors.insert(css, selector);
        }
        Ok(Self(selectors))
    }

    fn get(&self, css: &str) -> Option<&Selector> {
        self.0.get(css)
    }

    fn read(&self, block: ElementRef<'_>, field: &Field) -> Option<String> {
        let value = match *field {
            Field::Text(css) => block
                .select(self.get(css)?)
                .map(|el| collapse_whitespace(el.text()))
                .find(|text| !text.is_empty()),
            Field::Attr(css, attr) => block
                .select(self.get(css)?)
                .find_map(|el| el.value().attr(attr))
                .map(str::to_string),
            Field::BlockAttr(attr) => block.value().attr(attr).map(str::to_string),
            Field::AttrWithChild { css, child, attr } => block
                .select(self.get(css)?)
                .filter(|el| {
                    el.children()
                        .filter_map(ElementRef::wrap)
                        .any(|c| c.value().name() == child)
                })
                .find_map(|el| el.value().attr(attr))
                .map(str::to_string),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Generic listing-page extractor driven by a [`SiteRule`].
pub struct SiteScraper {
    rule: SiteRule,
    fetcher: Arc<PageFetcher>,
    normalizer: TimestampNormalizer,
}

impl SiteScraper {
    pub fn new(rule: SiteRule, fetcher: Arc<PageFetcher>, normalizer: TimestampNormalizer) -> Self {
        Self {
            rule,
            fetcher,
            normalizer,
        }
    }

    pub fn rule(&self) -> &SiteRule {
        &self.rule
    }

    /// Lift records off an already fetched listing body. Blocks without a
    /// title are dropped; blocks that fail mid-way are skipped.
    pub fn parse_listing(&self, body: &str) -> Result<Vec<RawArticle>> {
        self.read_listing(&Html::parse_document(body))
    }

    fn read_listing(&self, document: &Html) -> Result<Vec<RawArticle>> {
        let selectors = Selectors::compile(&self.rule)?;
        let block_selector = selectors
            .get(self.rule.block)
            .ok_or_else(|| Error::Selector(self.rule.block.to_string()))?;

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for block in document.select(block_selector) {
            match self.read_block(&selectors, block) {
                Ok(Some(record)) => {
                    if self.rule.unique_links && !seen.insert(record.link.clone()) {
                        continue;
                    }
                    if self.rule.require_timestamp && record.published_at_raw.is_none() {
                        continue;
                    }
                    records.push(record);
                }
                Ok(None) => {}
                Err(e) => debug!(source = self.rule.name, error = %e, "skipping article block"),
            }
        }
        Ok(records)
    }

    fn read_block(&self, selectors: &Selectors, block: ElementRef<'_>) -> Result<Option<RawArticle>> {
        let rule = &self.rule;
        let title = match selectors.read(block, &rule.title) {
            Some(title) => title,
            None => return Ok(None),
        };

        let href = selectors
            .read(block, &rule.link)
            .ok_or_else(|| Error::ExtractionSkip(format!("no link for {:?}", title)))?;
        let link = complete_link(rule.origin, &href)?;

        let image = rule
            .image
            .and_then(|field| selectors.read(block, &field))
            .map(|src| (rule.rewrite_image)(&src))
            .filter(|src| !src.is_empty());

        let published_at_raw = rule
            .timestamp
            .iter()
            .find_map(|field| selectors.read(block, field))
            .or_else(|| rule.timestamp_from_link.and_then(|derive| derive(&href)));

        let display = published_at_raw
            .as_deref()
            .map(|raw| self.normalizer.display(raw))
            .unwrap_or_default();

        let record = RawArticle {
            title,
            link,
            image,
            source: rule.name.to_string(),
            category: rule.category,
            published_at_raw,
        };

        let view = BlockView {
            href: &href,
            display: &display,
        };
        Ok((rule.accept)(&record, &view).then_some(record))
    }
}

#[async_trait]
impl Scraper for SiteScraper {
    fn source_metadata(&self) -> SourceMetadata {
        self.rule.metadata()
    }

    async fn extract(&self) -> Result<Vec<RawArticle>> {
        let page = match self.fetcher.fetch(self.rule.url).await {
            Some(page) => page,
            None => {
                warn!(source = self.rule.name, url = self.rule.url, "listing page unavailable");
                return Ok(Vec::new());
            }
        };
        self.read_listing(&page.document())
    }
}

/// Resolve a scraped href against the site origin. Absolute links pass through.
pub fn complete_link(origin: &str, href: &str) -> Result<String> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Ok(format!("https://{}", rest));
    }
    Ok(Url::parse(origin)?.join(href)?.to_string())
}

pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// URL of the last candidate in a `srcset`-style list.
pub fn last_srcset_candidate(srcset: &str) -> &str {
    srcset
        .split(", ")
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .last()
        .and_then(|candidate| candidate.split_whitespace().next())
        .unwrap_or("")
}

fn collapse_whitespace<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every site rule, in registration order.
pub fn all_rules() -> Vec<SiteRule> {
    let mut rules = Vec::new();
    rules.extend(technology::rules());
    rules.extend(economy::rules());
    rules.extend(sports::rules());
    rules.extend(politics::rules());
    rules.extend(lifestyle::rules());
    rules.extend(entertainment::rules());
    rules
}

/// Returns all registered extractors sharing one fetcher.
pub fn get_scrapers(fetcher: Arc<PageFetcher>, normalizer: TimestampNormalizer) -> Vec<Arc<dyn Scraper>> {
    all_rules()
        .into_iter()
        .map(|rule| Arc::new(SiteScraper::new(rule, fetcher.clone(), normalizer)) as Arc<dyn Scraper>)
        .collect()
}
