//! Text and number helpers shared by the page extractors.

use scraper::node::Node;
use scraper::{ElementRef, Selector};

/// Parse a selector known at compile time.
pub(crate) fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

/// Visible text of an element: whitespace-normalized and trimmed, with the
/// content of `img`, `script` and `style` descendants ignored.
pub fn element_text(el: &ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in el.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|a| {
                matches!(
                    a.value(),
                    Node::Element(e) if matches!(e.name(), "img" | "script" | "style")
                )
            });
            if !hidden {
                parts.push(text);
            }
        }
    }
    normalize_ws(&parts.concat())
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the `index`-th cell, or empty when the row is too short.
pub fn cell_text(cells: &[ElementRef<'_>], index: usize) -> String {
    cells.get(index).map(element_text).unwrap_or_default()
}

/// Parse a number after stripping currency symbols, percent signs,
/// thousands separators and spaces. `None` on anything else.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '%' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a percentage such as `"45%"`. Values outside `[0, 100]` are treated
/// as unreadable rather than clamped.
pub fn parse_percent(raw: &str) -> Option<u8> {
    let value = parse_number(raw)?;
    if (0.0..=100.0).contains(&value) {
        Some(value.floor() as u8)
    } else {
        None
    }
}

/// Label of a `div.name` / `div.value` info row: first colon removed,
/// whitespace normalized.
pub fn info_label(raw: &str) -> String {
    normalize_ws(&raw.replacen(':', "", 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_element_text_skips_images_and_scripts() {
        let html = Html::parse_fragment(
            r#"<table><tr><td> <img src="flag.png" alt="DE"> Berlin <script>new ProgressBar('a',0,1,1)</script></td></tr></table>"#,
        );
        let td = html.select(&sel("td")).next().unwrap();
        assert_eq!(element_text(&td), "Berlin");
    }

    #[test]
    fn test_parse_number_strips_symbols() {
        assert_eq!(parse_number("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number(" 12 % "), Some(12.0));
        assert_eq!(parse_number("€ 99"), Some(99.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_percent_range() {
        assert_eq!(parse_percent("45%"), Some(45));
        assert_eq!(parse_percent("100%"), Some(100));
        assert_eq!(parse_percent("0%"), Some(0));
        assert_eq!(parse_percent("130%"), None);
        assert_eq!(parse_percent("-3%"), None);
        assert_eq!(parse_percent("sleeping"), None);
    }

    #[test]
    fn test_info_label() {
        assert_eq!(info_label(" Location:\n "), "Location");
        assert_eq!(info_label("Time: 10:30"), "Time 10:30");
    }
}
