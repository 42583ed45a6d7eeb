use nw_core::{Category, RawArticle};

use super::{accept_all, keep_image, BlockView, Field, SiteRule};

pub fn rules() -> Vec<SiteRule> {
    vec![indian_express(), variety()]
}

fn indian_express() -> SiteRule {
    SiteRule {
        name: "Indian Express",
        key: "indianexpress-entertainment",
        category: Category::Entertainment,
        url: "https://indianexpress.com/section/entertainment/",
        origin: "https://indianexpress.com",
        block: "article[class*='myie-articles']",
        title: Field::Text("h2 > a"),
        link: Field::Attr("h2 > a", "href"),
        image: Some(Field::Attr("img", "data-src")),
        timestamp: &[Field::Text("div[class='my-time']")],
        timestamp_from_link: None,
        rewrite_image: keep_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}

// Film stories linked absolutely, and only those carrying a full date.
fn variety_accept(_record: &RawArticle, block: &BlockView<'_>) -> bool {
    block.href.contains("variety.com") && block.href.contains("/film/") && block.display.contains(", ")
}

fn variety() -> SiteRule {
    SiteRule {
        name: "Variety",
        key: "variety-film",
        category: Category::Entertainment,
        url: "https://variety.com/v/film/",
        origin: "https://variety.com",
        block: "li > article",
        title: Field::Text("h3 > a"),
        link: Field::Attr("h3 > a", "href"),
        image: Some(Field::Attr("img", "src")),
        timestamp: &[Field::Text("time[class*='c-timestamp']")],
        timestamp_from_link: None,
        rewrite_image: keep_image,
        accept: variety_accept,
        unique_links: false,
        require_timestamp: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fixtures::{rule_by_key, scraper_for};

    #[test]
    fn test_variety_keeps_dated_film_stories() {
        let page = r#"
            <ul>
              <li><article>
                <img src="https://variety.com/wp-content/uploads/2025/10/dune.jpg?w=300">
                <h3><a href="https://variety.com/2025/film/news/dune-3-1236/">Dune 3 casting</a></h3>
                <time class="c-timestamp">October 6, 2025 9:00am PT</time>
              </article></li>
              <li><article>
                <h3><a href="https://variety.com/2025/tv/news/show-1/">TV story</a></h3>
                <time class="c-timestamp">October 6, 2025 8:00am PT</time>
              </article></li>
              <li><article>
                <h3><a href="https://variety.com/2025/film/news/undated/">Undated film story</a></h3>
              </article></li>
              <li><article>
                <h3><a href="/2025/film/news/relative-link/">Relative film story</a></h3>
                <time class="c-timestamp">October 6, 2025 7:00am PT</time>
              </article></li>
            </ul>
        "#;
        let records = scraper_for(rule_by_key(rules(), "variety-film")).parse_listing(page).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Dune 3 casting");
        assert_eq!(records[0].image.as_deref(), Some("https://variety.com/wp-content/uploads/2025/10/dune.jpg"));
        assert_eq!(records[0].published_at_raw.as_deref(), Some("October 6, 2025 9:00am PT"));
    }

    #[test]
    fn test_indian_express_entertainment_listing() {
        let page = r#"
            <article class="myie-articles article-1">
              <img data-src="https://images.indianexpress.com/2025/10/film.jpg">
              <h2><a href="https://indianexpress.com/article/entertainment/bollywood/film-1/">Trailer out</a></h2>
              <div class="my-time">October 6, 2025 18:05 IST</div>
            </article>
        "#;
        let records = scraper_for(rule_by_key(rules(), "indianexpress-entertainment"))
            .parse_listing(page)
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].published_at_raw.as_deref(), Some("October 6, 2025 18:05 IST"));
    }
}
