//! Garage list page and truck/trailer detail pages.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use super::progress::progress_bars;
use super::text::{element_text, info_label, sel};
use super::Extracted;
use crate::types::{EntityId, Vehicle, VehicleDetail, VehicleKind};

const SECTION: &str = "div.portlet.light";
const SECTION_TITLE: &str = "div.portlet-title";
const ENTRY: &str = "div.mt-action";
const TRUCK_BUTTON: &str = "button[onclick*='garage_truck&t=']";
const TRAILER_BUTTON: &str = "button[onclick*='garage_trailer&t=']";
const NAME: &str = "span.mt-action-author";
const INFO_ROW: &str = "div.row.static-info";
const TIRE_TYPE: &str = "span.label-warning";
const TIRE_BAR_ID: &str = "tirecondition";

fn vehicle_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"t=(\d+)").expect("vehicle id regex is valid"))
}

/// Extract trucks and trailers from the garage page, trucks first within each
/// section in document order.
pub fn extract_garage(html: &str) -> Extracted<Vehicle> {
    let document = Html::parse_document(html);
    let title_sel = sel(SECTION_TITLE);
    let entry_sel = sel(ENTRY);

    let mut out = Extracted::default();

    for section in document.select(&sel(SECTION)) {
        let Some(title) = section.select(&title_sel).next() else {
            continue;
        };
        let title = element_text(&title);
        let kind = if title.contains("Trucks") {
            VehicleKind::Truck
        } else if title.contains("Trailers") {
            VehicleKind::Trailer
        } else {
            continue;
        };

        for entry in section.select(&entry_sel) {
            match parse_entry(&entry, kind) {
                Some(vehicle) => out.records.push(vehicle),
                None => {
                    tracing::debug!("Garage entry without {} id skipped", kind.entity_kind());
                    out.missing_ids += 1;
                }
            }
        }
    }
    out
}

fn parse_entry(entry: &ElementRef<'_>, kind: VehicleKind) -> Option<Vehicle> {
    let (button, fallback_name) = match kind {
        VehicleKind::Truck => (TRUCK_BUTTON, "Unknown Truck"),
        VehicleKind::Trailer => (TRAILER_BUTTON, "Unknown Trailer"),
    };

    let onclick = entry
        .select(&sel(button))
        .next()
        .and_then(|b| b.value().attr("onclick"))?;
    let id = vehicle_id_re()
        .captures(onclick)
        .and_then(|c| c.get(1))
        .and_then(|m| EntityId::parse(m.as_str()))?;

    let name = entry
        .select(&sel(NAME))
        .next()
        .or_else(|| entry.select(&sel("a")).next())
        .map(|el| element_text(&el))
        .unwrap_or_else(|| fallback_name.to_string());

    let name_sel = sel("div.name");
    let value_sel = sel("div.value");
    let info = entry
        .select(&sel(INFO_ROW))
        .filter_map(|row| {
            let label = row.select(&name_sel).next()?;
            let value = row.select(&value_sel).next()?;
            Some((
                info_label(&element_text(&label)).to_lowercase(),
                element_text(&value),
            ))
        })
        .collect();

    Some(Vehicle {
        id,
        kind,
        name,
        info,
        condition: None,
        tire_condition: None,
        tire_type: None,
    })
}

/// Read condition, tire condition and tire type from a detail page.
///
/// Condition comes from the first progress bar that is not the tire bar.
/// Trailers have no tire bar or tire label, so those stay `None`.
pub fn extract_vehicle_detail(html: &str) -> VehicleDetail {
    let bars = progress_bars(html);
    let condition = bars
        .iter()
        .find(|b| b.element_id != TIRE_BAR_ID)
        .and_then(|b| b.whole_percentage());
    let tire_condition = bars
        .iter()
        .find(|b| b.element_id == TIRE_BAR_ID)
        .and_then(|b| b.whole_percentage());

    let document = Html::parse_document(html);
    let tire_type = document
        .select(&sel(TIRE_TYPE))
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty());

    VehicleDetail {
        condition,
        tire_condition,
        tire_type,
    }
}
