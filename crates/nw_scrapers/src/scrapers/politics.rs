use nw_core::Category;
use url::Url;

use super::{accept_all, last_srcset_candidate, strip_query, Field, SiteRule};

pub fn rules() -> Vec<SiteRule> {
    vec![economic_times(), ny_times()]
}

fn economic_times_image(src: &str) -> String {
    strip_query(src).replace(",width-160,height-120", ",width-640,height-480")
}

fn economic_times() -> SiteRule {
    SiteRule {
        name: "Economic Times",
        key: "economictimes-politics",
        category: Category::Politics,
        url: "https://economictimes.indiatimes.com/news/politics",
        origin: "https://economictimes.indiatimes.com",
        block: "div[class*='botplData flt']",
        title: Field::Text("h3 > a"),
        link: Field::Attr("h3 > a", "href"),
        image: Some(Field::Attr("img", "data-original")),
        timestamp: &[
            Field::Attr("time[class='date-format']", "data-time"),
            Field::Text("time[class='date-format']"),
        ],
        timestamp_from_link: None,
        rewrite_image: economic_times_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}

/// NYT listings carry no visible time; the date lives in the path,
/// e.g. `/2025/10/06/us/politics/...` or `/interactive/2025/10/06/...`.
pub fn date_from_nyt_link(href: &str) -> Option<String> {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.to_string(),
    };
    let path = path.replace("/interactive", "");
    let parts: Vec<&str> = path.split('/').skip(1).take(3).collect();
    let is_date = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    is_date.then(|| parts.join("-"))
}

fn ny_times_image(src: &str) -> String {
    strip_query(last_srcset_candidate(src)).replace("-square320", "-square640")
}

fn ny_times() -> SiteRule {
    SiteRule {
        name: "New York Times",
        key: "nytimes-politics",
        category: Category::Politics,
        url: "https://www.nytimes.com/section/politics",
        origin: "https://www.nytimes.com",
        block: "li[class*='css-18yolpw']",
        title: Field::Text("a > h3"),
        link: Field::AttrWithChild {
            css: "a",
            child: "h3",
            attr: "href",
        },
        image: Some(Field::Attr("img", "src")),
        timestamp: &[],
        timestamp_from_link: Some(date_from_nyt_link),
        rewrite_image: ny_times_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}
