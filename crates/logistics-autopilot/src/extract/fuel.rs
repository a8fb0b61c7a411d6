//! Fuel station page (`index.php?a=fuelstation`).
//!
//! Every truck is its own `tbody` with id `truck-<id>`; the gauge is a
//! `span[id^='fuel']` wrapping the inline progress-bar script.

use scraper::Html;

use super::progress::{first_progress_bar, fuel_percentage};
use super::text::{element_text, sel};
use super::Extracted;
use crate::types::{EntityId, TruckFuel};

const TRUCK_BODY: &str = "tbody[id^='truck-']";
const TRUCK_PREFIX: &str = "truck-";
const NAME_LINK: &str = "a[href*='fuelstation']";
const GAUGE: &str = "span[id^='fuel']";

pub fn extract_fuel(html: &str) -> Extracted<TruckFuel> {
    let document = Html::parse_document(html);
    let row_sel = sel("tr");
    let link_sel = sel(NAME_LINK);
    let gauge_sel = sel(GAUGE);

    let mut out = Extracted::default();

    for body in document.select(&sel(TRUCK_BODY)) {
        let id = body
            .value()
            .id()
            .and_then(|raw| raw.strip_prefix(TRUCK_PREFIX))
            .and_then(EntityId::parse);
        let Some(id) = id else {
            out.missing_ids += 1;
            continue;
        };

        let name = body
            .select(&row_sel)
            .next()
            .map(|row| match row.select(&link_sel).next() {
                Some(link) => element_text(&link),
                None => element_text(&row),
            })
            .unwrap_or_default();

        let gauge = body
            .select(&gauge_sel)
            .next()
            .and_then(|span| first_progress_bar(&span.inner_html()));
        if gauge.is_none() {
            tracing::debug!("Fuel gauge for truck {id} unreadable, assuming full");
        }

        out.records.push(TruckFuel {
            id,
            name,
            fuel_percentage: fuel_percentage(gauge.as_ref()),
            gauge,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FUEL_HTML: &str = r#"
    <html><body><table>
      <tbody id="truck-2809719">
        <tr><td><a href="index.php?a=fuelstation&t=2809719">DAF XF</a></td></tr>
        <tr><td><span id="fuel2809719"><script>new ProgressBar('fuel2809719', 0, 520, 26);</script></span></td></tr>
      </tbody>
      <tbody id="truck-2809720">
        <tr><td>MAN TGX</td></tr>
        <tr><td><span id="fuel2809720"></span></td></tr>
      </tbody>
      <tbody id="truck-">
        <tr><td>Broken</td></tr>
      </tbody>
    </table></body></html>
    "#;

    #[test]
    fn test_extracts_gauges() {
        let out = extract_fuel(FUEL_HTML);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.missing_ids, 1);

        let daf = &out.records[0];
        assert_eq!(daf.id.as_str(), "2809719");
        assert_eq!(daf.name, "DAF XF");
        assert_eq!(daf.fuel_percentage, 5.0);
        assert_eq!(daf.gauge.as_ref().map(|g| g.max), Some(520.0));
    }

    #[test]
    fn test_missing_gauge_reads_full() {
        let out = extract_fuel(FUEL_HTML);
        let man = &out.records[1];
        assert_eq!(man.name, "MAN TGX");
        assert!(man.gauge.is_none());
        assert_eq!(man.fuel_percentage, 100.0);
    }
}
