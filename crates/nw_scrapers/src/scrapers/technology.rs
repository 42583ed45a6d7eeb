use nw_core::Category;

use super::{accept_all, keep_image, last_srcset_candidate, strip_query, Field, SiteRule};

pub fn rules() -> Vec<SiteRule> {
    vec![techcrunch(), the_verge()]
}

fn techcrunch() -> SiteRule {
    SiteRule {
        name: "TechCrunch",
        key: "techcrunch",
        category: Category::Technology,
        url: "https://techcrunch.com/latest/?offset=30",
        origin: "https://techcrunch.com",
        block: "div[class*='loop-card--post-type-post']",
        title: Field::Text("h3 a"),
        link: Field::Attr("h3 a", "href"),
        image: Some(Field::Attr("figure > img", "src")),
        timestamp: &[Field::Attr(
            "time[class='loop-card__meta-item loop-card__time wp-block-tc23-post-time-ago']",
            "datetime",
        )],
        timestamp_from_link: None,
        rewrite_image: keep_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}

// Images come as a srcset; the last candidate is the widest.
fn verge_image(srcset: &str) -> String {
    strip_query(last_srcset_candidate(srcset)).to_string()
}

fn the_verge() -> SiteRule {
    SiteRule {
        name: "The Verge",
        key: "theverge",
        category: Category::Technology,
        url: "https://www.theverge.com/tech",
        origin: "https://www.theverge.com",
        block: "div[class*='hp1qhq3'] div[class*='duet--content-cards--content-card _1u']",
        title: Field::Text("a"),
        link: Field::Attr("a[class*='_1lkmsmo0']", "href"),
        image: Some(Field::Attr("img", "srcset")),
        timestamp: &[Field::Attr("time", "datetime")],
        timestamp_from_link: None,
        rewrite_image: verge_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fixtures::{rule_by_key, scraper_for};

    #[test]
    fn test_techcrunch_listing() {
        let page = r#"
            <div class="wp-block-post loop-card loop-card--post-type-post loop-card--default">
              <figure class="loop-card__figure"><img src="https://techcrunch.com/wp-content/uploads/a.jpg"></figure>
              <h3 class="loop-card__title"><a href="https://techcrunch.com/2025/10/06/openai-devday/">OpenAI DevDay recap</a></h3>
              <time class="loop-card__meta-item loop-card__time wp-block-tc23-post-time-ago"
                    datetime="2025-10-06T16:42:00-07:00">2 hours ago</time>
            </div>
            <div class="loop-card loop-card--post-type-podcast">
              <h3><a href="https://techcrunch.com/podcast/">Not a post</a></h3>
            </div>
        "#;
        let records = scraper_for(rule_by_key(rules(), "techcrunch")).parse_listing(page).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "OpenAI DevDay recap");
        assert_eq!(record.link, "https://techcrunch.com/2025/10/06/openai-devday/");
        assert_eq!(record.image.as_deref(), Some("https://techcrunch.com/wp-content/uploads/a.jpg"));
        assert_eq!(record.published_at_raw.as_deref(), Some("2025-10-06T16:42:00-07:00"));
        assert_eq!(record.category, Category::Technology);
    }

    #[test]
    fn test_verge_listing_prefixes_relative_links() {
        let page = r#"
            <div class="hp1qhq3 x">
              <div class="duet--content-cards--content-card _1ufh7nr1 y">
                <a class="_1lkmsmo0 z" href="/news/1/pixel-10-review">Pixel 10 review</a>
                <img srcset="https://platform.theverge.com/a.jpg?quality=90&amp;w=256 256w, https://platform.theverge.com/a.jpg?quality=90&amp;w=1200 1200w">
                <time datetime="2025-10-06T12:00:00.000Z">Oct 6</time>
              </div>
            </div>
        "#;
        let records = scraper_for(rule_by_key(rules(), "theverge")).parse_listing(page).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Pixel 10 review");
        assert_eq!(records[0].link, "https://www.theverge.com/news/1/pixel-10-review");
        assert_eq!(records[0].image.as_deref(), Some("https://platform.theverge.com/a.jpg"));
        assert_eq!(records[0].published_at_raw.as_deref(), Some("2025-10-06T12:00:00.000Z"));
    }
}
