//! Configuration loading and resolution.
//!
//! All settings are static for the lifetime of a process: base URL, endpoint
//! templates, thresholds, success sentinels and the column maps used by the
//! table extractors. Every field has a default that matches the live game, so
//! an empty file (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::types::EntityId;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LOGISTICS_AUTOPILOT_CONFIG";

/// Environment variable overriding `session_cookie`.
pub const SESSION_ENV: &str = "LOGISTICS_AUTOPILOT_SESSION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    pub base_url: String,
    /// Raw `Cookie` header value of a logged-in session.
    pub session_cookie: Option<String>,
    pub user_agent: String,
    pub request_timeout_ms: u64,
    pub endpoints: Endpoints,
    pub thresholds: Thresholds,
    pub sentinels: Sentinels,
    pub employees: EmployeeTables,
    pub trips: TripTable,
    pub freight: FreightButtons,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.logitycoon.com/eu1/".to_string(),
            session_cookie: None,
            user_agent: format!("logistics-autopilot/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_ms: 30_000,
            endpoints: Endpoints::default(),
            thresholds: Thresholds::default(),
            sentinels: Sentinels::default(),
            employees: EmployeeTables::default(),
            trips: TripTable::default(),
            freight: FreightButtons::default(),
        }
    }
}

/// Path templates relative to `base_url`. `{id}` is replaced by the entity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub employees_page: String,
    pub employee_detail: String,
    pub employee_sleep: String,
    pub garage_page: String,
    pub truck_detail: String,
    pub trailer_detail: String,
    pub repair: String,
    pub fuel_station_page: String,
    pub refuel: String,
    pub trips_page: String,
    pub trip_accept: String,
    pub freight_detail: String,
    /// Fallback POST target for freight buttons without a usable link.
    pub freight_action: String,
    /// Page listing the freights the freight cycle walks through.
    pub freight_list_page: String,
    pub warehouse_page: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            employees_page: "index.php?a=employees".into(),
            employee_detail: "index.php?a=employees_select&e={id}".into(),
            employee_sleep: "ajax/employee_sleep.php?e={id}".into(),
            garage_page: "index.php?a=garage".into(),
            truck_detail: "index.php?a=garage_truck&t={id}".into(),
            trailer_detail: "index.php?a=garage_trailer&t={id}".into(),
            repair: "ajax/garage_repair.php".into(),
            fuel_station_page: "index.php?a=fuelstation".into(),
            refuel: "ajax/fuelstation_refuel.php?x={id}&p=1&returnfr=0".into(),
            trips_page: "index.php?a=trips".into(),
            trip_accept: "ajax/trip_accept.php".into(),
            freight_detail: "index.php?a=freight&n={id}".into(),
            freight_action: "ajax/freight_action.php".into(),
            freight_list_page: "index.php?a=warehouse".into(),
            warehouse_page: "index.php?a=warehouse".into(),
        }
    }
}

impl Endpoints {
    fn named(&self) -> [(&'static str, &str); 15] {
        [
            ("employees_page", &self.employees_page),
            ("employee_detail", &self.employee_detail),
            ("employee_sleep", &self.employee_sleep),
            ("garage_page", &self.garage_page),
            ("truck_detail", &self.truck_detail),
            ("trailer_detail", &self.trailer_detail),
            ("repair", &self.repair),
            ("fuel_station_page", &self.fuel_station_page),
            ("refuel", &self.refuel),
            ("trips_page", &self.trips_page),
            ("trip_accept", &self.trip_accept),
            ("freight_detail", &self.freight_detail),
            ("freight_action", &self.freight_action),
            ("freight_list_page", &self.freight_list_page),
            ("warehouse_page", &self.warehouse_page),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Refuel when the gauge is strictly below this percentage.
    pub fuel_percentage: f64,
    /// Repair when condition is strictly below this value.
    pub condition: u8,
    /// Sleep when an idle employee is strictly below this percentage.
    pub sleep_percent: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fuel_percentage: 99.0,
            condition: 100,
            sleep_percent: 100,
        }
    }
}

/// Values of the JSON `error` field that mean the action went through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentinels {
    pub success: Vec<String>,
    /// The trip endpoint reports acceptance as `ERROR_FREIGHT_ACCEPTED`.
    pub trip_accepted: Vec<String>,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            success: vec!["SUCCESS".into()],
            trip_accepted: vec!["ERROR_FREIGHT_ACCEPTED".into()],
        }
    }
}

/// Column indices (into the row's `td` cells) of one employee table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterColumns {
    /// Substring of the panel caption that selects this table.
    pub title: String,
    pub salary: usize,
    pub location: usize,
    pub sleep: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_card: Option<usize>,
    pub action: usize,
    pub available: usize,
    pub pallet: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeTables {
    pub rosters: Vec<RosterColumns>,
}

impl Default for EmployeeTables {
    fn default() -> Self {
        Self {
            rosters: vec![
                RosterColumns {
                    title: "Truckers".into(),
                    salary: 2,
                    location: 3,
                    sleep: 4,
                    id_card: Some(5),
                    action: 6,
                    available: 7,
                    pallet: 8,
                },
                RosterColumns {
                    title: "Warehouse Employees".into(),
                    salary: 2,
                    location: 3,
                    sleep: 4,
                    id_card: None,
                    action: 5,
                    available: 6,
                    pallet: 7,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripTable {
    pub id: usize,
    pub earnings: usize,
    pub departure: usize,
    pub destination: usize,
    pub distance: usize,
    pub trip_type: usize,
    /// Rows with fewer cells are not trip rows.
    pub min_cells: usize,
}

impl Default for TripTable {
    fn default() -> Self {
        Self {
            id: 0,
            earnings: 1,
            departure: 2,
            destination: 3,
            distance: 4,
            trip_type: 8,
            min_cells: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreightButtons {
    /// Buttons pressed in this order when present.
    pub vocabulary: Vec<String>,
    pub random_label: String,
    /// CSS selector for the status indicators checked before a random press.
    pub status_selector: String,
}

impl Default for FreightButtons {
    fn default() -> Self {
        Self {
            vocabulary: ["load", "drive", "unload", "finish", "continue driving"]
                .into_iter()
                .map(String::from)
                .collect(),
            random_label: "random".into(),
            status_selector: "span.badge, span.label".into(),
        }
    }
}

impl AutopilotConfig {
    /// Load a TOML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: AutopilotConfig = toml::from_str(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load the resolved config file, or defaults when none exists.
    pub fn resolve(explicit: Option<&str>) -> ConfigResult<Self> {
        match resolve_config_path(explicit) {
            Some(path) => {
                tracing::info!("Loading config: {}", path.display());
                Self::load(&path)
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                let mut config = Self::default();
                config.apply_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(cookie) = std::env::var(SESSION_ENV) {
            if !cookie.trim().is_empty() {
                self.session_cookie = Some(cookie);
            }
        }
    }

    /// Check that the base URL parses, every template joins onto it and the
    /// status selector is valid CSS.
    pub fn validate(&self) -> ConfigResult<()> {
        let base = self.base()?;
        for (name, template) in self.endpoints.named() {
            let rendered = template.replace("{id}", "0");
            base.join(&rendered)
                .map_err(|e| ConfigError::InvalidEndpoint {
                    name: name.to_string(),
                    template: template.to_string(),
                    reason: e.to_string(),
                })?;
        }
        scraper::Selector::parse(&self.freight.status_selector).map_err(|e| {
            ConfigError::InvalidSelector {
                selector: self.freight.status_selector.clone(),
                reason: format!("{e:?}"),
            }
        })?;
        Ok(())
    }

    fn base(&self) -> ConfigResult<Url> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Absolute URL for a path or template, with `{id}` substituted.
    ///
    /// Falls back to plain concatenation if the join fails; `validate` has
    /// already rejected templates that cannot join.
    pub fn url(&self, template: &str, id: Option<&EntityId>) -> String {
        let path = match id {
            Some(id) => template.replace("{id}", id.as_str()),
            None => template.to_string(),
        };
        match self.base().ok().and_then(|b| b.join(&path).ok()) {
            Some(u) => u.to_string(),
            None => format!("{}{}", self.base_url, path),
        }
    }
}

/// Resolve the config file path.
///
/// Order: explicit path, `LOGISTICS_AUTOPILOT_CONFIG`, `./autopilot.toml`,
/// then `<config dir>/logistics-autopilot/config.toml`.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from("autopilot.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    dirs::config_dir()
        .map(|d| d.join("logistics-autopilot").join("config.toml"))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AutopilotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds.fuel_percentage, 99.0);
        assert_eq!(config.employees.rosters.len(), 2);
        assert_eq!(config.employees.rosters[0].id_card, Some(5));
    }

    #[test]
    fn test_url_substitutes_id() {
        let config = AutopilotConfig::default();
        let id = EntityId::parse("2809719").unwrap();
        assert_eq!(
            config.url(&config.endpoints.refuel, Some(&id)),
            "https://www.logitycoon.com/eu1/ajax/fuelstation_refuel.php?x=2809719&p=1&returnfr=0"
        );
        assert_eq!(
            config.url(&config.endpoints.garage_page, None),
            "https://www.logitycoon.com/eu1/index.php?a=garage"
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            base_url = "http://127.0.0.1:8080/eu1/"

            [thresholds]
            fuel_percentage = 50.0

            [freight]
            random_label = "shuffle"
        "#;
        let config: AutopilotConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080/eu1/");
        assert_eq!(config.thresholds.fuel_percentage, 50.0);
        assert_eq!(config.thresholds.condition, 100);
        assert_eq!(config.freight.random_label, "shuffle");
        assert_eq!(config.freight.vocabulary.len(), 5);
        assert_eq!(config.endpoints.trip_accept, "ajax/trip_accept.php");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = AutopilotConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_invalid_status_selector_rejected() {
        let mut config = AutopilotConfig::default();
        config.freight.status_selector = "span[".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autopilot.toml");
        std::fs::write(
            &path,
            "request_timeout_ms = 1500\n[sentinels]\nsuccess = [\"SUCCESS\", \"OK\"]\n",
        )
        .unwrap();
        let config = AutopilotConfig::load(&path).unwrap();
        assert_eq!(config.request_timeout_ms, 1500);
        assert_eq!(config.sentinels.success, vec!["SUCCESS", "OK"]);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = AutopilotConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: AutopilotConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
