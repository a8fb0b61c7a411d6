//! Pure decisions: given a record, which action (if any) should run.

use crate::config::{AutopilotConfig, FreightButtons, Thresholds};
use crate::types::{
    Action, ButtonPress, Employee, EntityRecord, FreightDetail, Trip, TruckFuel, Vehicle,
};

/// Employee action text meaning "idle".
pub const IDLE_ACTION: &str = "Nothing";

#[derive(Debug, Clone)]
pub struct Evaluator {
    thresholds: Thresholds,
    buttons: FreightButtons,
}

impl Evaluator {
    pub fn new(config: &AutopilotConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            buttons: config.freight.clone(),
        }
    }

    pub fn evaluate(&self, record: &EntityRecord) -> Option<Action> {
        let action = match record {
            EntityRecord::Employee(e) => self.should_sleep(e).then_some(Action::Sleep),
            EntityRecord::Vehicle(v) => self.should_repair(v).then_some(Action::Repair),
            EntityRecord::Fuel(f) => self.should_refuel(f).then_some(Action::Refuel),
            EntityRecord::Trip(_) => Some(Action::AcceptTrip),
            EntityRecord::Freight(f) => self.plan_buttons(f).map(Action::PressButtons),
        };
        tracing::debug!(
            "{} {}: {}",
            record.kind(),
            record.id(),
            action.as_ref().map(Action::name).unwrap_or("no action")
        );
        action
    }

    /// Idle and not fully rested. An unreadable sleep value never qualifies.
    pub fn should_sleep(&self, employee: &Employee) -> bool {
        employee.action == IDLE_ACTION
            && employee
                .sleep_percent
                .is_some_and(|s| s < self.thresholds.sleep_percent)
    }

    /// Condition known and below the threshold.
    pub fn should_repair(&self, vehicle: &Vehicle) -> bool {
        vehicle
            .condition
            .is_some_and(|c| c < self.thresholds.condition)
    }

    pub fn should_refuel(&self, truck: &TruckFuel) -> bool {
        truck.fuel_percentage < self.thresholds.fuel_percentage
    }

    /// The trip to accept: the first one on the page. No ranking.
    pub fn select_trip<'a>(&self, trips: &'a [Trip]) -> Option<&'a Trip> {
        trips.first()
    }

    /// Ordered presses for a freight page, or `None` when no vocabulary
    /// button is present.
    ///
    /// A `random` press goes first when the page has a random button and any
    /// status indicator fails [`denotes_available`].
    pub fn plan_buttons(&self, freight: &FreightDetail) -> Option<Vec<ButtonPress>> {
        let find = |label: &str| {
            freight
                .buttons
                .iter()
                .find(|b| b.label() == label)
                .map(|b| ButtonPress {
                    label: label.to_string(),
                    button: b.clone(),
                })
        };

        let mut presses: Vec<ButtonPress> = self
            .buttons
            .vocabulary
            .iter()
            .filter_map(|word| find(&word.trim().to_lowercase()))
            .collect();
        if presses.is_empty() {
            return None;
        }

        let needs_random = freight.status.iter().any(|s| !denotes_available(s));
        if needs_random {
            if let Some(random) = find(&self.buttons.random_label.trim().to_lowercase()) {
                presses.insert(0, random);
            }
        }
        Some(presses)
    }
}

/// An indicator like `"2 available"`: mentions "available" and starts with a
/// count greater than zero.
pub fn denotes_available(indicator: &str) -> bool {
    let text = indicator.trim().to_lowercase();
    if !text.contains("available") {
        return false;
    }
    let count: String = text.chars().take_while(char::is_ascii_digit).collect();
    count.parse::<u64>().is_ok_and(|n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityId, FreightButton, VehicleKind};

    fn evaluator() -> Evaluator {
        Evaluator::new(&AutopilotConfig::default())
    }

    fn employee(action: &str, sleep: Option<u8>) -> Employee {
        Employee {
            id: EntityId::parse("1").unwrap(),
            name: "Anna".into(),
            roster: "Truckers".into(),
            salary: String::new(),
            location: String::new(),
            sleep_percent: sleep,
            id_card: None,
            action: action.into(),
            available: String::new(),
            pallet: String::new(),
        }
    }

    fn vehicle(condition: Option<u8>) -> Vehicle {
        Vehicle {
            id: EntityId::parse("2").unwrap(),
            kind: VehicleKind::Truck,
            name: "Volvo".into(),
            info: Vec::new(),
            condition,
            tire_condition: None,
            tire_type: None,
        }
    }

    fn button(text: &str) -> FreightButton {
        FreightButton {
            tag: "button".into(),
            text: text.into(),
            onclick: None,
            href: None,
        }
    }

    fn freight(buttons: &[&str], status: &[&str]) -> FreightDetail {
        FreightDetail {
            id: EntityId::parse("919").unwrap(),
            details: Vec::new(),
            financial_overview: Vec::new(),
            buttons: buttons.iter().map(|b| button(b)).collect(),
            status: status.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn labels(action: Option<Action>) -> Vec<String> {
        match action {
            Some(Action::PressButtons(presses)) => presses.into_iter().map(|p| p.label).collect(),
            other => panic!("expected button presses, got {other:?}"),
        }
    }

    #[test]
    fn test_sleep_truth_table() {
        let ev = evaluator();
        assert!(ev.should_sleep(&employee("Nothing", Some(45))));
        assert!(!ev.should_sleep(&employee("Driving", Some(45))));
        assert!(!ev.should_sleep(&employee("Nothing", Some(100))));
        assert!(!ev.should_sleep(&employee("Nothing", None)));
    }

    #[test]
    fn test_repair_only_known_damage() {
        let ev = evaluator();
        assert!(ev.should_repair(&vehicle(Some(99))));
        assert!(!ev.should_repair(&vehicle(Some(100))));
        assert!(!ev.should_repair(&vehicle(None)));
        assert_eq!(
            ev.evaluate(&EntityRecord::Vehicle(vehicle(Some(3)))),
            Some(Action::Repair)
        );
    }

    #[test]
    fn test_refuel_threshold() {
        let ev = evaluator();
        let truck = |pct: f64| TruckFuel {
            id: EntityId::parse("3").unwrap(),
            name: "DAF".into(),
            gauge: None,
            fuel_percentage: pct,
        };
        assert!(ev.should_refuel(&truck(5.0)));
        assert!(ev.should_refuel(&truck(98.9)));
        assert!(!ev.should_refuel(&truck(99.0)));
        assert!(!ev.should_refuel(&truck(100.0)));
    }

    #[test]
    fn test_select_first_trip() {
        let trip = |id: &str| Trip {
            id: EntityId::parse(id).unwrap(),
            earnings: None,
            departure: String::new(),
            destination: String::new(),
            distance: String::new(),
            trip_type: String::new(),
        };
        let ev = evaluator();
        let trips = vec![trip("10"), trip("11")];
        assert_eq!(ev.select_trip(&trips).map(|t| t.id.as_str()), Some("10"));
        assert!(ev.select_trip(&[]).is_none());
    }

    #[test]
    fn test_denotes_available() {
        assert!(denotes_available("2 available"));
        assert!(denotes_available(" 12 Available trucks"));
        assert!(!denotes_available("0 available"));
        assert!(!denotes_available("available"));
        assert!(!denotes_available("drive"));
    }

    #[test]
    fn test_random_pressed_first_when_unavailable() {
        let ev = evaluator();
        let plan = ev.evaluate(&EntityRecord::Freight(freight(
            &["Drive", "Random"],
            &["0 available", "drive"],
        )));
        assert_eq!(labels(plan), vec!["random", "drive"]);
    }

    #[test]
    fn test_no_random_when_available() {
        let ev = evaluator();
        let plan = ev.evaluate(&EntityRecord::Freight(freight(
            &["Random", "Unload", "Load"],
            &["2 available"],
        )));
        assert_eq!(labels(plan), vec!["load", "unload"]);
    }

    #[test]
    fn test_vocabulary_order_and_case() {
        let ev = evaluator();
        let plan = ev.plan_buttons(&freight(
            &[" FINISH ", "Continue Driving", "Load"],
            &[],
        ));
        let labels: Vec<String> = plan.unwrap().into_iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["load", "finish", "continue driving"]);
    }

    #[test]
    fn test_no_random_without_status_indicators() {
        let ev = evaluator();
        let plan = ev.evaluate(&EntityRecord::Freight(freight(&["Random", "Drive"], &[])));
        assert_eq!(labels(plan), vec!["drive"]);
    }

    #[test]
    fn test_random_alone_does_not_fire() {
        let ev = evaluator();
        assert!(ev
            .plan_buttons(&freight(&["Random", "Close"], &["0 available"]))
            .is_none());
    }
}
