//! HTML text, title and link extraction.

use scraper::{Html, Node, Selector};
use url::Url;

/// Elements whose text never reaches the document.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "aside"];

/// What the crawler keeps from one HTML page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub title: String,
    pub text: String,
    pub links: Vec<Url>,
}

/// Parse a page. Links are resolved against `base` with fragments removed.
pub fn parse_page(body: &str, base: &Url) -> ParsedPage {
    let document = Html::parse_document(body);
    ParsedPage {
        title: extract_title(&document),
        text: visible_text(&document),
        links: extract_links(&document, base),
    }
}

fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Text nodes outside hidden elements, each trimmed, joined by one space.
fn visible_text(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let Node::Text(text) = node.value() else {
                return None;
            };
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
            });
            let trimmed = text.trim();
            (!hidden && !trimmed.is_empty()).then_some(trimmed)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_links(document: &Html, base: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(strip_fragment)
        .collect()
}

pub fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title> Hours of Work </title><style>.x{color:red}</style></head>
          <body>
            <nav>Home | Menu</nav>
            <h1>Hours of work</h1>
            <p>Most employees work <b>8 hours</b> a day.</p>
            <script>track()</script>
            <aside>Related links</aside>
            <a href="/overtime#pay">Overtime</a>
            <a href="https://other.ca/x">Elsewhere</a>
            <a href="mailto:help@ontario.ca">Email</a>
            <footer>Copyright</footer>
          </body>
        </html>"#;

    #[test]
    fn test_title_and_visible_text() {
        let base = Url::parse("https://www.ontario.ca/hours").unwrap();
        let page = parse_page(PAGE, &base);

        assert_eq!(page.title, "Hours of Work");
        assert!(page.text.contains("Hours of work Most employees work 8 hours a day."));
        for hidden in ["Home | Menu", "track()", "Related links", "Copyright", "color:red"] {
            assert!(!page.text.contains(hidden), "leaked {hidden}");
        }
    }

    #[test]
    fn test_links_resolved_without_fragments() {
        let base = Url::parse("https://www.ontario.ca/hours").unwrap();
        let page = parse_page(PAGE, &base);

        let links: Vec<&str> = page.links.iter().map(Url::as_str).collect();
        assert_eq!(links, vec!["https://www.ontario.ca/overtime", "https://other.ca/x"]);
    }

    #[test]
    fn test_missing_title_is_empty() {
        let base = Url::parse("https://a.ca/").unwrap();
        let page = parse_page("<p>text</p>", &base);
        assert_eq!(page.title, "");
        assert_eq!(page.text, "text");
    }
}
