//! Warehouse page (`index.php?a=warehouse`): freights waiting to be taken.
//!
//! The table is responsive, so columns are found by their visibility classes
//! and content rather than by a fixed index.

use scraper::{ElementRef, Html};

use super::text::{element_text, parse_number, sel};
use super::Extracted;
use crate::types::{EntityId, Trip};

const AVAILABLE_ROWS: &str = "tbody#tbody-available tr";

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

pub fn extract_warehouse(html: &str) -> Extracted<Trip> {
    let document = Html::parse_document(html);
    let span_sel = sel("span");
    let mut out = Extracted::default();

    for row in document.select(&sel(AVAILABLE_ROWS)) {
        let cells: Vec<ElementRef<'_>> = row.children().filter_map(ElementRef::wrap).collect();
        let texts: Vec<String> = cells.iter().map(element_text).collect();

        let id = cells
            .iter()
            .zip(&texts)
            .find(|(c, t)| has_class(c, "hidden-xs") && t.starts_with('#'))
            .and_then(|(_, t)| EntityId::parse(t.trim_start_matches('#')));
        let Some(id) = id else {
            out.missing_ids += 1;
            continue;
        };

        let visible: Vec<&String> = cells
            .iter()
            .zip(&texts)
            .filter(|(c, _)| has_class(c, "visible-sm"))
            .map(|(_, t)| t)
            .collect();

        let trip_type = cells
            .iter()
            .zip(&texts)
            .find(|(c, t)| has_class(c, "hidden-xs") && t.to_lowercase().contains("default"))
            .map(|(c, t)| match c.select(&span_sel).next() {
                Some(span) => element_text(&span),
                None => t.clone(),
            })
            .unwrap_or_default();

        out.records.push(Trip {
            id,
            earnings: texts.get(1).and_then(|t| parse_number(t)),
            departure: visible.first().map(|t| t.to_string()).unwrap_or_default(),
            destination: visible.get(1).map(|t| t.to_string()).unwrap_or_default(),
            distance: texts
                .iter()
                .find(|t| t.ends_with("km"))
                .cloned()
                .unwrap_or_default(),
            trip_type,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAREHOUSE_HTML: &str = r#"
    <html><body><table><tbody id="tbody-available">
      <tr>
        <td class="hidden-xs">#4410</td>
        <td class="hidden-xs">$3,120</td>
        <td class="visible-sm"><img src="de.png"> Berlin</td>
        <td class="visible-sm"><img src="pl.png"> Warsaw</td>
        <td>573 km</td>
        <td class="hidden-xs"><span><img src="t.png"> Default</span></td>
      </tr>
      <tr>
        <td class="hidden-xs">pending</td>
        <td class="hidden-xs">$10</td>
      </tr>
    </tbody></table></body></html>
    "#;

    #[test]
    fn test_extracts_available_freights() {
        let out = extract_warehouse(WAREHOUSE_HTML);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.missing_ids, 1);

        let freight = &out.records[0];
        assert_eq!(freight.id.as_str(), "4410");
        assert_eq!(freight.earnings, Some(3120.0));
        assert_eq!(freight.departure, "Berlin");
        assert_eq!(freight.destination, "Warsaw");
        assert_eq!(freight.distance, "573 km");
        assert_eq!(freight.trip_type, "Default");
    }

    #[test]
    fn test_missing_table_is_empty() {
        let out = extract_warehouse("<html><body><table></table></body></html>");
        assert!(out.records.is_empty());
        assert_eq!(out.missing_ids, 0);
    }
}
