//! Freight detail page (`index.php?a=freight&n=<id>`).
//!
//! Besides the detail and financial panels this collects every clickable
//! element that looks like a freight action, so the evaluator can plan
//! presses and the dispatcher can work out what each press requests.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::text::{cell_text, element_text, info_label, sel};
use super::Extracted;
use crate::types::{EntityId, FinancialLine, FreightButton, FreightDetail};

const TITLE: &str = "h1.page-title";
const PORTLET: &str = "div.portlet";
const DETAILS_HEADING: &str = "Freight Details";
const FINANCIAL_HEADING: &str = "Financial Overview";
const FINANCIAL_ROWS: &str = "table.table-bordered tbody tr";
const CLICKABLE: &str = "button, a, [onclick*='freight']";
const ACTION_WORDS: [&str; 7] = [
    "freight", "load", "drive", "unload", "finish", "random", "continue",
];

fn freight_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\d+)").expect("freight id regex is valid"))
}

fn onclick_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"['"]([^'"\s]*\.php[^'"\s]*)['"]"#).expect("onclick url regex is valid")
    })
}

/// Extract a freight detail page. The result holds at most one record; a
/// page whose title carries no `#<id>` counts as one missing id.
pub fn extract_freight(html: &str, status_selector: &str) -> Extracted<FreightDetail> {
    let document = Html::parse_document(html);
    let mut out = Extracted::default();

    let id = document
        .select(&sel(TITLE))
        .next()
        .map(|t| element_text(&t))
        .and_then(|t| {
            freight_id_re()
                .captures(&t)
                .and_then(|c| c.get(1))
                .and_then(|m| EntityId::parse(m.as_str()))
        });
    let Some(id) = id else {
        tracing::warn!("Freight page without an id in its title");
        out.missing_ids = 1;
        return out;
    };

    out.records.push(FreightDetail {
        id,
        details: details(&document),
        financial_overview: financial_overview(&document),
        buttons: buttons(&document),
        status: status(&document, status_selector),
    });
    out
}

fn portlet_containing<'a>(document: &'a Html, heading: &str) -> Option<ElementRef<'a>> {
    document
        .select(&sel(PORTLET))
        .find(|p| p.text().collect::<String>().contains(heading))
}

fn details(document: &Html) -> Vec<(String, String)> {
    let Some(portlet) = portlet_containing(document, DETAILS_HEADING) else {
        return Vec::new();
    };
    let name_sel = sel("div.name");
    let value_sel = sel("div.value");
    portlet
        .select(&sel("div.row.static-info"))
        .filter_map(|row| {
            let name = row.select(&name_sel).next()?;
            let value = row.select(&value_sel).next()?;
            Some((info_label(&element_text(&name)), element_text(&value)))
        })
        .collect()
}

fn financial_overview(document: &Html) -> Vec<FinancialLine> {
    let Some(portlet) = portlet_containing(document, FINANCIAL_HEADING) else {
        return Vec::new();
    };
    let cell_sel = sel("td");
    portlet
        .select(&sel(FINANCIAL_ROWS))
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
            (cells.len() >= 5).then(|| FinancialLine {
                label: cell_text(&cells, 0),
                status: cell_text(&cells, 1),
                gross_price: cell_text(&cells, 2),
                quantity: cell_text(&cells, 3),
                net_total: cell_text(&cells, 4),
            })
        })
        .collect()
}

fn buttons(document: &Html) -> Vec<FreightButton> {
    document
        .select(&sel(CLICKABLE))
        .filter_map(|el| {
            let text = element_text(&el);
            let onclick = el.value().attr("onclick").map(str::to_string);
            let href = el.value().attr("href").map(str::to_string);

            let lower = text.to_lowercase();
            let mentions_action = ACTION_WORDS.iter().any(|w| lower.contains(w));
            let targets_freight = onclick
                .iter()
                .chain(href.iter())
                .any(|a| a.contains("freight"));
            (mentions_action || targets_freight).then(|| FreightButton {
                tag: el.value().name().to_string(),
                text,
                onclick,
                href,
            })
        })
        .collect()
}

fn status(document: &Html, status_selector: &str) -> Vec<String> {
    let selector = match Selector::parse(status_selector) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Invalid status selector {status_selector:?}: {e:?}");
            return Vec::new();
        }
    };
    document
        .select(&selector)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .collect()
}

/// What pressing a freight button requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonTarget {
    /// GET this URL, relative to the base URL unless absolute.
    Link(String),
    /// No usable link; post the button label to the freight action endpoint.
    FormAction,
}

/// Resolve a button's request: a real `href` wins, then a quoted `.php` URL
/// inside `onclick`, otherwise the form fallback.
pub fn button_target(button: &FreightButton) -> ButtonTarget {
    if let Some(href) = button.href.as_deref().map(str::trim) {
        let lower = href.to_ascii_lowercase();
        if !href.is_empty() && !href.starts_with('#') && !lower.starts_with("javascript:") {
            return ButtonTarget::Link(href.to_string());
        }
    }
    if let Some(url) = button
        .onclick
        .as_deref()
        .and_then(|js| onclick_url_re().captures(js))
        .and_then(|c| c.get(1))
    {
        return ButtonTarget::Link(url.as_str().to_string());
    }
    ButtonTarget::FormAction
}
