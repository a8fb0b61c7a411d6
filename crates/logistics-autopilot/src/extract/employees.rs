//! Employees page (`index.php?a=employees`).
//!
//! Each roster is a `div.portlet.light.bordered` panel whose caption names
//! it ("Truckers", "Warehouse Employees"). Rows carry a profile link with the
//! employee id; the other fields sit at roster-specific column indices.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use super::text::{cell_text, element_text, parse_percent, sel};
use super::Extracted;
use crate::config::{EmployeeTables, RosterColumns};
use crate::types::{Employee, EntityId};

const PANEL: &str = "div.portlet.light.bordered";
const CAPTION: &str = "div.portlet-title .caption .caption-subject";
const ROWS: &str = "table.table tbody tr";
const PROFILE_LINK: &str = "a[href*='index.php?a=employees_select&e=']";

fn employee_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"e=(\d+)").expect("employee id regex is valid"))
}

/// Extract every employee row from the rosters named in `tables`.
pub fn extract_employees(html: &str, tables: &EmployeeTables) -> Extracted<Employee> {
    let document = Html::parse_document(html);
    let panel_sel = sel(PANEL);
    let caption_sel = sel(CAPTION);
    let rows_sel = sel(ROWS);

    let mut out = Extracted::default();

    for panel in document.select(&panel_sel) {
        let Some(caption) = panel.select(&caption_sel).next() else {
            continue;
        };
        let title = element_text(&caption);
        let Some(roster) = tables.rosters.iter().find(|r| title.contains(&r.title)) else {
            continue;
        };

        for row in panel.select(&rows_sel) {
            match parse_row(&row, roster) {
                Some(employee) => out.records.push(employee),
                None => out.missing_ids += 1,
            }
        }
    }

    if out.records.is_empty() && out.missing_ids == 0 {
        tracing::warn!("No employee rosters found on page");
    }
    out
}

fn parse_row(row: &ElementRef<'_>, roster: &RosterColumns) -> Option<Employee> {
    let link = row.select(&sel(PROFILE_LINK)).next()?;
    let href = link.value().attr("href")?;
    let id = employee_id_re()
        .captures(href)
        .and_then(|c| c.get(1))
        .and_then(|m| EntityId::parse(m.as_str()))?;

    let cells: Vec<ElementRef<'_>> = row.select(&sel("td")).collect();
    let sleep = cell_text(&cells, roster.sleep);

    Some(Employee {
        id,
        name: element_text(&link),
        roster: roster.title.clone(),
        salary: cell_text(&cells, roster.salary),
        location: cell_text(&cells, roster.location),
        sleep_percent: parse_percent(&sleep),
        id_card: roster.id_card.map(|i| cell_text(&cells, i)),
        action: cell_text(&cells, roster.action),
        available: cell_text(&cells, roster.available),
        pallet: cell_text(&cells, roster.pallet),
    })
}
