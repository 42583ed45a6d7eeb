use nw_core::{Category, RawArticle};

use super::{accept_all, keep_image, strip_query, BlockView, Field, SiteRule};

pub fn rules() -> Vec<SiteRule> {
    vec![indian_express(), fox_news()]
}

fn indian_express() -> SiteRule {
    SiteRule {
        name: "Indian Express",
        key: "indianexpress-lifestyle",
        category: Category::Lifestyle,
        url: "https://indianexpress.com/article/lifestyle/",
        origin: "https://indianexpress.com",
        block: "div[class*='articles ']",
        title: Field::Text("h2 > a"),
        link: Field::Attr("h2 > a", "href"),
        image: Some(Field::Attr("img", "data-src")),
        timestamp: &[Field::Text("div[class='date']")],
        timestamp_from_link: None,
        rewrite_image: keep_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}

fn fox_image(src: &str) -> String {
    strip_query(src).replace("/348/196/", "/720/405/")
}

// The health page mixes in promos and other sections.
fn fox_accept(record: &RawArticle, _block: &BlockView<'_>) -> bool {
    record.link.contains("/health/")
}

fn fox_news() -> SiteRule {
    SiteRule {
        name: "Fox News",
        key: "foxnews-health",
        category: Category::Lifestyle,
        url: "https://www.foxnews.com/health",
        origin: "https://www.foxnews.com",
        block: "article[class*='article']",
        title: Field::Text("h4 > a"),
        link: Field::Attr("h4 > a", "href"),
        image: Some(Field::Attr("img", "src")),
        timestamp: &[Field::Text("span[class*='time']")],
        timestamp_from_link: None,
        rewrite_image: fox_image,
        accept: fox_accept,
        unique_links: true,
        require_timestamp: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fixtures::{rule_by_key, scraper_for};

    #[test]
    fn test_fox_news_dedups_before_dropping_undated() {
        let page = r#"
            <article class="article story-1">
              <img src="https://a57.foxnews.com/static/2025/10/348/196/sleep.jpg?ve=1&amp;tl=1">
              <h4 class="title"><a href="/health/sleep-study">Sleep study surprises</a></h4>
              <span class="time">3 hours ago</span>
            </article>
            <article class="article story-2">
              <h4 class="title"><a href="/health/sleep-study">Sleep study surprises</a></h4>
              <span class="time">3 hours ago</span>
            </article>
            <article class="article story-3">
              <h4 class="title"><a href="/politics/other">Off section</a></h4>
              <span class="time">1 hour ago</span>
            </article>
            <article class="article story-4">
              <h4 class="title"><a href="/health/undated">No time shown</a></h4>
              <span class="time">  </span>
            </article>
            <article class="article story-5">
              <h4 class="title"><a href="/health/flu-season">Flu season</a></h4>
            </article>
            <article class="article story-6">
              <h4 class="title"><a href="/health/flu-season">Flu season</a></h4>
              <span class="time">2 hours ago</span>
            </article>
        "#;
        let records = scraper_for(rule_by_key(rules(), "foxnews-health")).parse_listing(page).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, "https://www.foxnews.com/health/sleep-study");
        assert_eq!(
            records[0].image.as_deref(),
            Some("https://a57.foxnews.com/static/2025/10/720/405/sleep.jpg")
        );
        assert_eq!(records[0].published_at_raw.as_deref(), Some("3 hours ago"));
    }

    #[test]
    fn test_indian_express_lifestyle_listing() {
        let page = r#"
            <div class="articles lifestyle">
              <img data-src="https://images.indianexpress.com/2025/10/yoga.jpg?w=300">
              <h2><a href="https://indianexpress.com/article/lifestyle/fitness/yoga-1/">Morning yoga</a></h2>
              <div class="date">October 6, 2025 07:00 IST</div>
            </div>
        "#;
        let records = scraper_for(rule_by_key(rules(), "indianexpress-lifestyle"))
            .parse_listing(page)
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::Lifestyle);
        assert_eq!(records[0].image.as_deref(), Some("https://images.indianexpress.com/2025/10/yoga.jpg"));
    }
}
