//! Trips page (`index.php?a=trips`).

use scraper::{ElementRef, Html};

use super::text::{cell_text, element_text, parse_number, sel};
use super::Extracted;
use crate::config::TripTable;
use crate::types::{EntityId, Trip};

const TRIP_ROWS: &str = "table#rectrips tbody tr";
const RADIO: &str = "input[type='radio']";

/// Extract trip offers in document order. Rows with fewer than
/// `columns.min_cells` cells are layout rows and ignored outright.
pub fn extract_trips(html: &str, columns: &TripTable) -> Extracted<Trip> {
    let document = Html::parse_document(html);
    let cell_sel = sel("td");
    let radio_sel = sel(RADIO);
    let span_sel = sel("span");

    let mut out = Extracted::default();

    for row in document.select(&sel(TRIP_ROWS)) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        if cells.len() < columns.min_cells {
            continue;
        }

        let id = cells
            .get(columns.id)
            .and_then(|c| c.select(&radio_sel).next())
            .and_then(|r| r.value().attr("value"))
            .and_then(EntityId::parse);
        let Some(id) = id else {
            out.missing_ids += 1;
            continue;
        };

        let trip_type = cells
            .get(columns.trip_type)
            .and_then(|c| c.select(&span_sel).next())
            .map(|span| element_text(&span))
            .unwrap_or_default();

        out.records.push(Trip {
            id,
            earnings: parse_number(&cell_text(&cells, columns.earnings)),
            departure: cell_text(&cells, columns.departure),
            destination: cell_text(&cells, columns.destination),
            distance: cell_text(&cells, columns.distance),
            trip_type,
        });
    }

    if out.records.is_empty() {
        tracing::debug!("No trips on page");
    }
    out
}
