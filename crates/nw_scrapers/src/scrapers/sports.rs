use nw_core::Category;

use super::{accept_all, keep_image, strip_query, Field, SiteRule};

pub fn rules() -> Vec<SiteRule> {
    vec![indian_express(), hindustan_times()]
}

fn indian_express() -> SiteRule {
    SiteRule {
        name: "Indian Express",
        key: "indianexpress-sports",
        category: Category::Sports,
        url: "https://indianexpress.com/article/sports/",
        origin: "https://indianexpress.com",
        block: "div[class*='articles ']",
        title: Field::Text("h2 > a"),
        link: Field::Attr("h2 > a", "href"),
        image: Some(Field::Attr("img", "src")),
        timestamp: &[Field::Text("div[class='date']")],
        timestamp_from_link: None,
        rewrite_image: keep_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}

fn hindustan_times_image(src: &str) -> String {
    strip_query(src).replace("/148x111/", "/550x309/")
}

fn hindustan_times() -> SiteRule {
    SiteRule {
        name: "Hindustan Times",
        key: "hindustantimes-sports",
        category: Category::Sports,
        url: "https://www.hindustantimes.com/sports",
        origin: "https://www.hindustantimes.com",
        block: "div[data-vars-storytype*='story'][class*='listView']",
        title: Field::Text("h2 > a"),
        link: Field::Attr("h2 > a", "href"),
        image: Some(Field::Attr("img", "data-src")),
        timestamp: &[
            Field::Text("div[class='dateTime secTime ftldateTime']"),
            Field::BlockAttr("data-vars-story-time"),
        ],
        timestamp_from_link: None,
        rewrite_image: hindustan_times_image,
        accept: accept_all,
        unique_links: false,
        require_timestamp: false,
    }
}
