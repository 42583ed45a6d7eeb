use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Fixed set of sections an article can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Economy,
    Sports,
    Politics,
    Lifestyle,
    Entertainment,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Technology,
        Category::Economy,
        Category::Sports,
        Category::Politics,
        Category::Lifestyle,
        Category::Entertainment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Economy => "economy",
            Category::Sports => "sports",
            Category::Politics => "politics",
            Category::Lifestyle => "lifestyle",
            Category::Entertainment => "entertainment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Economy => "Economy",
            Category::Sports => "Sports",
            Category::Politics => "Politics",
            Category::Lifestyle => "Lifestyle",
            Category::Entertainment => "Entertainment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| Error::InvalidRecord(format!("unknown category: {}", s)))
    }
}

/// An article block as lifted off a listing page, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    pub link: String,
    pub image: Option<String>,
    pub source: String,
    pub category: Category,
    pub published_at_raw: Option<String>,
}

/// Normalized article keyed by its absolute link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalArticle {
    pub link: String,
    pub title: String,
    pub source: String,
    pub category: Category,
    pub image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CanonicalArticle {
    pub fn headline(&self) -> Headline {
        Headline {
            title: self.title.clone(),
            source: self.source.clone(),
        }
    }
}

/// Field set handed to storage for a create-or-update keyed by `link`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub link: String,
    pub title: String,
    pub source: String,
    pub category: Category,
    pub image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewArticle {
    /// Insert path: a brand new canonical record stamped with `created_at`.
    pub fn into_canonical(self, created_at: DateTime<Utc>) -> CanonicalArticle {
        CanonicalArticle {
            link: self.link,
            title: self.title,
            source: self.source,
            category: self.category,
            image: self.image,
            published_at: self.published_at,
            created_at,
        }
    }

    /// Update path: mutable fields are overwritten, `published_at` only fills a gap.
    pub fn apply_to(&self, existing: &mut CanonicalArticle) {
        existing.title = self.title.clone();
        existing.source = self.source.clone();
        existing.category = self.category;
        existing.image = self.image.clone();
        if existing.published_at.is_none() && self.published_at.is_some() {
            existing.published_at = self.published_at;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub article: CanonicalArticle,
    pub created: bool,
}

/// Title plus publisher, the shape the LLM prompts work with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
}

impl From<&RawArticle> for Headline {
    fn from(article: &RawArticle) -> Self {
        Self {
            title: article.title.clone(),
            source: article.source.clone(),
        }
    }
}

/// Totals derived from a set of scraped records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_source: BTreeMap<String, usize>,
}

impl RunStats {
    pub fn from_records(records: &[RawArticle]) -> Self {
        let mut stats = RunStats::default();
        for record in records {
            stats.total += 1;
            *stats.by_category.entry(record.category).or_insert(0) += 1;
            *stats.by_source.entry(record.source.clone()).or_insert(0) += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(link: &str, source: &str, category: Category) -> RawArticle {
        RawArticle {
            title: "t".to_string(),
            link: link.to_string(),
            image: None,
            source: source.to_string(),
            category,
            published_at_raw: None,
        }
    }

    #[test]
    fn test_category_round_trip_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!(" Sports ".parse::<Category>().unwrap(), Category::Sports);
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn test_apply_keeps_existing_published_at() {
        let first = Utc.with_ymd_and_hms(2025, 10, 6, 16, 42, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 10, 7, 9, 0, 0).unwrap();
        let mut existing = NewArticle {
            link: "https://a.example/1".into(),
            title: "X".into(),
            source: "A".into(),
            category: Category::Economy,
            image: None,
            published_at: Some(first),
        }
        .into_canonical(first);

        let update = NewArticle {
            link: "https://a.example/1".into(),
            title: "Y".into(),
            source: "B".into(),
            category: Category::Politics,
            image: Some("https://img.example/1.jpg".into()),
            published_at: Some(second),
        };
        update.apply_to(&mut existing);

        assert_eq!(existing.title, "Y");
        assert_eq!(existing.source, "B");
        assert_eq!(existing.category, Category::Politics);
        assert_eq!(existing.image.as_deref(), Some("https://img.example/1.jpg"));
        assert_eq!(existing.published_at, Some(first));
    }

    #[test]
    fn test_run_stats_counts() {
        let records = vec![
            raw("a", "Indian Express", Category::Economy),
            raw("b", "Indian Express", Category::Sports),
            raw("c", "Variety", Category::Entertainment),
        ];
        let stats = RunStats::from_records(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_source["Indian Express"], 2);
        assert_eq!(stats.by_category[&Category::Entertainment], 1);
        assert!(!stats.by_category.contains_key(&Category::Technology));
    }
}
