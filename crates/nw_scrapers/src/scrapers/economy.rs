use nw_core::Category;

use super::{accept_all, keep_image, strip_query, Field, SiteRule};

pub fn rules() -> Vec<SiteRule> {
    vec![indian_express(), economic_times()]
}

fn indian_express() -> SiteRule {
    SiteRule {
        name: "Indian Express",
        key: "indianexpress-economy",
        category: Category::Economy,
        url: "https://indianexpress.com/section/business/economy/",
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

fn economic_times_image(src: &str) -> String {
    strip_query(src).replace(",width-160,height-120,", ",width-640,height-480,")
}

fn economic_times() -> SiteRule {
    SiteRule {
        name: "Economic Times",
        key: "economictimes-markets",
        category: Category::Economy,
        url: "https://economictimes.indiatimes.com/markets/stocks/news",
        origin: "https://economictimes.indiatimes.com",
        block: "div[class*='eachStory']",
        title: Field::Text("h3 > a"),
        link: Field::Attr("h3 > a", "href"),
        image: Some(Field::Attr("img", "src")),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fixtures::{rule_by_key, scraper_for};

    #[test]
    fn test_indian_express_economy_listing() {
        let page = r#"
            <div class="articles first">
              <div class="snaps"><img data-src="https://images.indianexpress.com/2025/10/rbi.jpg?w=210"></div>
              <h2 class="title"><a href="https://indianexpress.com/article/business/economy/rbi-policy-1234/">RBI holds repo rate</a></h2>
              <div class="date">October 6, 2025 16:42 IST</div>
            </div>
        "#;
        let records = scraper_for(rule_by_key(rules(), "indianexpress-economy"))
            .parse_listing(page)
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "RBI holds repo rate");
        assert_eq!(records[0].image.as_deref(), Some("https://images.indianexpress.com/2025/10/rbi.jpg"));
        assert_eq!(records[0].published_at_raw.as_deref(), Some("October 6, 2025 16:42 IST"));
        assert_eq!(records[0].source, "Indian Express");
    }

    #[test]
    fn test_economic_times_upsizes_thumbnails() {
        let page = r#"
            <div class="eachStory">
              <img src="https://img.etimg.com/thumb/msid-1,width-160,height-120,imgsize-1/photo.jpg?from=mdr">
              <h3><a href="/markets/stocks/news/sensex-rallies/articleshow/1.cms">Sensex rallies</a></h3>
              <time class="date-format" data-time="2025-10-06T16:42:00+05:30">Oct 6, 2025, 04:42 PM IST</time>
            </div>
            <div class="eachStory">
              <h3><a href="https://economictimes.indiatimes.com/markets/2.cms">Nifty slips</a></h3>
              <time class="date-format">Oct 6, 2025, 01:00 PM IST</time>
            </div>
        "#;
        let records = scraper_for(rule_by_key(rules(), "economictimes-markets"))
            .parse_listing(page)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].link,
            "https://economictimes.indiatimes.com/markets/stocks/news/sensex-rallies/articleshow/1.cms"
        );
        assert_eq!(
            records[0].image.as_deref(),
            Some("https://img.etimg.com/thumb/msid-1,width-640,height-480,imgsize-1/photo.jpg")
        );
        assert_eq!(records[0].published_at_raw.as_deref(), Some("2025-10-06T16:42:00+05:30"));

        assert_eq!(records[1].link, "https://economictimes.indiatimes.com/markets/2.cms");
        assert_eq!(records[1].published_at_raw.as_deref(), Some("Oct 6, 2025, 01:00 PM IST"));
        assert_eq!(records[1].image, None);
    }
}
