//! Entity records, actions and outcomes shared by every domain.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::extract::progress::ProgressBar;

/// Externally assigned identifier of a game object. Always a non-empty run
/// of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Accept `raw` (trimmed) only if it is a non-empty numeric string.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Employee,
    Truck,
    Trailer,
    Freight,
    Trip,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Employee => "employee",
            EntityKind::Truck => "truck",
            EntityKind::Trailer => "trailer",
            EntityKind::Freight => "freight",
            EntityKind::Trip => "trip",
        };
        f.write_str(s)
    }
}

/// A trucker or warehouse employee row from the employees page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Taken from the `e=` parameter of the profile link.
    pub id: EntityId,
    pub name: String,
    /// Title of the table the row came from (e.g. "Truckers").
    pub roster: String,
    /// Salary as displayed, currency symbol included.
    pub salary: String,
    pub location: String,
    /// Rest level; absent when the cell is not a 0..=100 percentage.
    pub sleep_percent: Option<u8>,
    /// Only present on rosters that carry an ID-card column.
    pub id_card: Option<String>,
    /// Current activity; "Nothing" when idle.
    pub action: String,
    /// Availability cell as displayed.
    pub available: String,
    /// Pallet the employee is assigned to, "-" when none.
    pub pallet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Truck,
    Trailer,
}

impl VehicleKind {
    pub fn entity_kind(self) -> EntityKind {
        match self {
            VehicleKind::Truck => EntityKind::Truck,
            VehicleKind::Trailer => EntityKind::Trailer,
        }
    }
}

/// A truck or trailer from the garage page, optionally enriched with the
/// values scraped from its detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: EntityId,
    pub kind: VehicleKind,
    pub name: String,
    /// Label/value rows from the garage list, labels lowercased.
    pub info: Vec<(String, String)>,
    /// Whole percentage from the detail page; absent until it was read.
    pub condition: Option<u8>,
    pub tire_condition: Option<u8>,
    pub tire_type: Option<String>,
}

impl Vehicle {
    /// Merge the detail-page values into a new record.
    pub fn with_detail(self, detail: VehicleDetail) -> Self {
        Self {
            condition: detail.condition,
            tire_condition: detail.tire_condition,
            tire_type: detail.tire_type,
            ..self
        }
    }

    pub fn info_value(&self, label: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

/// Values read from a truck or trailer detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleDetail {
    pub condition: Option<u8>,
    pub tire_condition: Option<u8>,
    pub tire_type: Option<String>,
}

/// A truck row from the fuel station page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckFuel {
    pub id: EntityId,
    pub name: String,
    pub gauge: Option<ProgressBar>,
    /// 100 when the gauge could not be read.
    pub fuel_percentage: f64,
}

/// A trip offer (trips page) or a freight row (warehouse page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Radio value on the trips page, freight number on the warehouse page.
    pub id: EntityId,
    /// Payout with currency formatting stripped; absent when unreadable.
    pub earnings: Option<f64>,
    pub departure: String,
    pub destination: String,
    /// Distance as displayed, e.g. "440 km".
    pub distance: String,
    /// Label such as "Default".
    pub trip_type: String,
}

/// One line of the freight financial overview table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialLine {
    /// First column, e.g. "Freight" or "Fuel".
    pub label: String,
    /// Payment state, e.g. "Paid".
    pub status: String,
    /// Unit price as displayed.
    pub gross_price: String,
    pub quantity: String,
    /// Line total as displayed.
    pub net_total: String,
}

/// A clickable element on the freight page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreightButton {
    /// Element name, `button` or `a`.
    pub tag: String,
    /// Visible text, untrimmed.
    pub text: String,
    pub onclick: Option<String>,
    pub href: Option<String>,
}

impl FreightButton {
    /// Lowercased, trimmed text used to match the action vocabulary.
    pub fn label(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

/// Everything scraped from a freight detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreightDetail {
    pub id: EntityId,
    /// Label/value rows of the "Freight Details" panel, in page order.
    pub details: Vec<(String, String)>,
    pub financial_overview: Vec<FinancialLine>,
    pub buttons: Vec<FreightButton>,
    /// Status indicator texts (e.g. "2 available").
    pub status: Vec<String>,
}

impl FreightDetail {
    pub fn detail(&self, label: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

/// Any record an extractor can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind_of_record", rename_all = "snake_case")]
pub enum EntityRecord {
    Employee(Employee),
    Vehicle(Vehicle),
    Fuel(TruckFuel),
    Trip(Trip),
    Freight(FreightDetail),
}

impl EntityRecord {
    pub fn id(&self) -> &EntityId {
        match self {
            EntityRecord::Employee(e) => &e.id,
            EntityRecord::Vehicle(v) => &v.id,
            EntityRecord::Fuel(f) => &f.id,
            EntityRecord::Trip(t) => &t.id,
            EntityRecord::Freight(f) => &f.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Employee(_) => EntityKind::Employee,
            EntityRecord::Vehicle(v) => v.kind.entity_kind(),
            EntityRecord::Fuel(_) => EntityKind::Truck,
            EntityRecord::Trip(_) => EntityKind::Trip,
            EntityRecord::Freight(_) => EntityKind::Freight,
        }
    }
}

/// A button the dispatcher should trigger, in plan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPress {
    /// Vocabulary word the button matched.
    pub label: String,
    pub button: FreightButton,
}

/// What the evaluator decided to do with an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "presses", rename_all = "snake_case")]
pub enum Action {
    Sleep,
    Repair,
    Refuel,
    AcceptTrip,
    PressButtons(Vec<ButtonPress>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Sleep => "sleep",
            Action::Repair => "repair",
            Action::Refuel => "refuel",
            Action::AcceptTrip => "accept_trip",
            Action::PressButtons(_) => "press_buttons",
        }
    }
}

/// Successful completion of an action chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub entity: EntityId,
    pub action: String,
    /// Number of requests issued, including detail-page visits.
    pub steps: usize,
    /// Sentinel returned by the last step, if the body was JSON.
    pub code: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_requires_digits() {
        assert_eq!(EntityId::parse(" 2809719 ").unwrap().as_str(), "2809719");
        assert!(EntityId::parse("").is_none());
        assert!(EntityId::parse("12a").is_none());
        assert!(EntityId::parse("-5").is_none());
    }

    #[test]
    fn test_vehicle_with_detail_keeps_identity() {
        let v = Vehicle {
            id: EntityId::parse("7").unwrap(),
            kind: VehicleKind::Trailer,
            name: "Krone".into(),
            info: vec![("location".into(), "Berlin".into())],
            condition: None,
            tire_condition: None,
            tire_type: None,
        };
        let enriched = v.clone().with_detail(VehicleDetail {
            condition: Some(87),
            ..Default::default()
        });
        assert_eq!(enriched.id, v.id);
        assert_eq!(enriched.condition, Some(87));
        assert_eq!(enriched.info_value("location"), Some("Berlin"));
        assert_eq!(EntityRecord::Vehicle(enriched).kind(), EntityKind::Trailer);
    }

    #[test]
    fn test_button_label_is_normalized() {
        let b = FreightButton {
            tag: "button".into(),
            text: "  Continue Driving ".into(),
            onclick: None,
            href: None,
        };
        assert_eq!(b.label(), "continue driving");
    }
}
