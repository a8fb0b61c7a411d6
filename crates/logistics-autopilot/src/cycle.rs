//! One pass over a game domain: fetch the list page, extract, evaluate and
//! dispatch every qualifying entity concurrently, then report.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::AutopilotConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ActionError, ConfigResult, ErrorKind, NetworkError};
use crate::evaluate::Evaluator;
use crate::extract::{
    extract_employees, extract_freight, extract_fuel, extract_garage, extract_trips,
    extract_vehicle_detail, extract_warehouse, Extracted,
};
use crate::fetcher::{FetchRequest, HttpFetcher, PageFetcher};
use crate::session::{DetailViewOrchestrator, SessionOrchestrator};
use crate::types::{ActionOutcome, EntityId, EntityRecord, Trip, Vehicle, VehicleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Employees,
    Garage,
    Fuel,
    Trips,
    Freight,
    /// List-only: freights waiting on the warehouse page.
    Warehouse,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Employees,
        Domain::Garage,
        Domain::Fuel,
        Domain::Trips,
        Domain::Freight,
        Domain::Warehouse,
    ];

    /// Domains whose cycle can change game state.
    pub const ACTING: [Domain; 5] = [
        Domain::Employees,
        Domain::Garage,
        Domain::Fuel,
        Domain::Trips,
        Domain::Freight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Employees => "employees",
            Domain::Garage => "garage",
            Domain::Fuel => "fuel",
            Domain::Trips => "trips",
            Domain::Freight => "freight",
            Domain::Warehouse => "warehouse",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Domain::ALL.iter().map(|d| d.as_str()).collect();
                format!("unknown domain '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub domain: Domain,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Entities with a valid id that went through evaluation.
    pub processed: usize,
    /// Entities whose action chain completed successfully.
    pub acted: usize,
    /// Candidate blocks dropped for lack of an id.
    pub skipped: usize,
    pub failures: BTreeMap<EntityId, ErrorKind>,
    /// Set when the pass could not run at all (list page unreachable).
    pub error: Option<String>,
}

impl CycleReport {
    fn new(domain: Domain) -> Self {
        Self {
            domain,
            started_at: Utc::now(),
            elapsed_ms: 0,
            processed: 0,
            acted: 0,
            skipped: 0,
            failures: BTreeMap::new(),
            error: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.failures.is_empty()
    }
}

/// How one entity's chain ended.
type ChainResult = Result<Option<ActionOutcome>, ErrorKind>;

pub struct Autopilot {
    config: Arc<AutopilotConfig>,
    fetcher: Arc<dyn PageFetcher>,
    evaluator: Evaluator,
    dispatcher: Dispatcher,
    views: Arc<dyn SessionOrchestrator>,
    shutdown: CancellationToken,
}

impl Autopilot {
    /// Autopilot talking to the configured game over HTTP.
    pub fn new(config: AutopilotConfig) -> ConfigResult<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::with_fetcher(Arc::new(config), fetcher))
    }

    /// Autopilot over any fetcher. Follow-up views go through the same one.
    pub fn with_fetcher(config: Arc<AutopilotConfig>, fetcher: Arc<dyn PageFetcher>) -> Self {
        let views = Arc::new(DetailViewOrchestrator::new(fetcher.clone(), config.clone()));
        Self {
            evaluator: Evaluator::new(&config),
            dispatcher: Dispatcher::new(fetcher.clone(), config.clone()),
            config,
            fetcher,
            views,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_views(mut self, views: Arc<dyn SessionOrchestrator>) -> Self {
        self.views = views;
        self
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    /// Token cancelled by [`Autopilot::shutdown`]; every chain runs on a child.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every in-flight chain. Chains stop before their next request.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Records on a saved page of `domain`. For [`Domain::Freight`] this is a
    /// freight detail page.
    pub fn extract_page(&self, domain: Domain, html: &str) -> Extracted<EntityRecord> {
        match domain {
            Domain::Employees => {
                extract_employees(html, &self.config.employees).map(EntityRecord::Employee)
            }
            Domain::Garage => extract_garage(html).map(EntityRecord::Vehicle),
            Domain::Fuel => extract_fuel(html).map(EntityRecord::Fuel),
            Domain::Trips => extract_trips(html, &self.config.trips).map(EntityRecord::Trip),
            Domain::Freight => {
                extract_freight(html, &self.config.freight.status_selector).map(EntityRecord::Freight)
            }
            Domain::Warehouse => extract_warehouse(html).map(EntityRecord::Trip),
        }
    }

    fn list_page(&self, domain: Domain) -> &str {
        let ep = &self.config.endpoints;
        match domain {
            Domain::Employees => &ep.employees_page,
            Domain::Garage => &ep.garage_page,
            Domain::Fuel => &ep.fuel_station_page,
            Domain::Trips => &ep.trips_page,
            Domain::Freight => &ep.freight_list_page,
            Domain::Warehouse => &ep.warehouse_page,
        }
    }

    /// GET a page and return its body, failing on transport errors and
    /// non-2xx statuses alike.
    async fn fetch_page(&self, url: String) -> Result<String, NetworkError> {
        let response = self.fetcher.fetch(FetchRequest::get(url.clone())).await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(NetworkError::new(url, format!("HTTP {}", response.status)))
        }
    }

    /// Run one pass over `domain`.
    pub async fn run_cycle(&self, domain: Domain) -> CycleReport {
        let clock = Instant::now();
        let mut report = CycleReport::new(domain);
        tracing::info!("Starting {domain} cycle");

        let url = self.config.url(self.list_page(domain), None);
        let html = match self.fetch_page(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("{domain} cycle aborted: {e}");
                report.error = Some(e.to_string());
                report.elapsed_ms = elapsed_ms(clock);
                return report;
            }
        };

        let results = match domain {
            Domain::Freight => {
                let listed = extract_warehouse(&html);
                report.skipped = listed.missing_ids;
                let ids: Vec<EntityId> = listed.records.into_iter().map(|t| t.id).collect();
                self.freight_chains(&ids).await
            }
            Domain::Warehouse => {
                let listed = self.extract_page(domain, &html);
                report.skipped = listed.missing_ids;
                listed
                    .records
                    .iter()
                    .map(|r| (r.id().clone(), Ok(None)))
                    .collect()
            }
            Domain::Trips => {
                let listed = extract_trips(&html, &self.config.trips);
                report.skipped = listed.missing_ids;
                self.trip_chain(listed.records).await
            }
            Domain::Garage => {
                let listed = extract_garage(&html);
                report.skipped = listed.missing_ids;
                let chains = listed.records.into_iter().map(|vehicle| {
                    let cancel = self.shutdown.child_token();
                    async move {
                        let id = vehicle.id.clone();
                        (id, self.vehicle_chain(vehicle, cancel).await)
                    }
                });
                join_all(chains).await
            }
            Domain::Employees | Domain::Fuel => {
                let listed = self.extract_page(domain, &html);
                report.skipped = listed.missing_ids;
                let chains = listed.records.into_iter().map(|record| {
                    let cancel = self.shutdown.child_token();
                    async move {
                        let id = record.id().clone();
                        (id, self.record_chain(&record, &cancel).await)
                    }
                });
                join_all(chains).await
            }
        };

        tally(&mut report, results);
        report.elapsed_ms = elapsed_ms(clock);
        tracing::info!(
            "{domain} cycle: {} processed, {} acted, {} skipped, {} failed in {}ms",
            report.processed,
            report.acted,
            report.skipped,
            report.failures.len(),
            report.elapsed_ms
        );
        report
    }

    /// Run the freight button cycle for explicit freight ids.
    pub async fn run_freight(&self, ids: &[EntityId]) -> CycleReport {
        let clock = Instant::now();
        let mut report = CycleReport::new(Domain::Freight);
        let results = self.freight_chains(ids).await;
        tally(&mut report, results);
        report.elapsed_ms = elapsed_ms(clock);
        tracing::info!(
            "freight run: {} processed, {} acted, {} failed",
            report.processed,
            report.acted,
            report.failures.len()
        );
        report
    }

    /// Evaluate a record and dispatch its action, if any.
    async fn record_chain(&self, record: &EntityRecord, cancel: &CancellationToken) -> ChainResult {
        let Some(action) = self.evaluator.evaluate(record) else {
            return Ok(None);
        };
        match self.dispatcher.dispatch(record, &action, cancel).await {
            Ok(outcome) => {
                tracing::info!("{} {}: {} done", record.kind(), record.id(), action.name());
                Ok(Some(outcome))
            }
            Err(e) => {
                tracing::warn!("{} {}: {} failed: {e}", record.kind(), record.id(), action.name());
                Err(e.kind())
            }
        }
    }

    /// Vehicles need their detail page before they can be judged.
    async fn vehicle_chain(&self, vehicle: Vehicle, cancel: CancellationToken) -> ChainResult {
        let template = match vehicle.kind {
            VehicleKind::Truck => &self.config.endpoints.truck_detail,
            VehicleKind::Trailer => &self.config.endpoints.trailer_detail,
        };
        let url = self.config.url(template, Some(&vehicle.id));
        let html = self.fetch_detail(url, &cancel).await.map_err(|e| {
            tracing::warn!("{} {}: detail page failed: {e}", vehicle.kind.entity_kind(), vehicle.id);
            e.kind()
        })?;

        let record = EntityRecord::Vehicle(vehicle.with_detail(extract_vehicle_detail(&html)));
        self.record_chain(&record, &cancel).await
    }

    /// Accept the selected trip. The rest of the page is evaluated with no
    /// action.
    async fn trip_chain(&self, trips: Vec<Trip>) -> Vec<(EntityId, ChainResult)> {
        let Some(selected) = self.evaluator.select_trip(&trips).cloned() else {
            tracing::info!("No trip to accept");
            return Vec::new();
        };
        let cancel = self.shutdown.child_token();
        let mut accepted = Some(
            self.record_chain(&EntityRecord::Trip(selected.clone()), &cancel)
                .await,
        );
        if matches!(accepted, Some(Ok(Some(_)))) {
            self.follow_accepted_trip(&selected.id).await;
        }

        trips
            .into_iter()
            .map(|trip| {
                let result = if trip.id == selected.id {
                    accepted.take().unwrap_or(Ok(None))
                } else {
                    Ok(None)
                };
                (trip.id, result)
            })
            .collect()
    }

    /// Show the accepted freight and reload the warehouse listing. Failures
    /// here are logged, never reported against the trip.
    async fn follow_accepted_trip(&self, id: &EntityId) {
        let view = async {
            let handle = self.views.open_concurrent_views(std::slice::from_ref(id)).await;
            self.views.close_all(handle).await;
        };
        let warehouse = self.fetch_page(self.config.url(&self.config.endpoints.warehouse_page, None));

        let ((), listing) = tokio::join!(view, warehouse);
        match listing {
            Ok(html) => tracing::info!(
                "Trip {id} accepted, warehouse lists {} freight(s)",
                extract_warehouse(&html).records.len()
            ),
            Err(e) => tracing::warn!("Trip {id} accepted, warehouse refresh failed: {e}"),
        }
    }

    async fn freight_chains(&self, ids: &[EntityId]) -> Vec<(EntityId, ChainResult)> {
        let chains = ids.iter().map(|id| {
            let cancel = self.shutdown.child_token();
            async move { (id.clone(), self.freight_chain(id, cancel).await) }
        });
        join_all(chains).await
    }

    /// Load a freight page, plan its button presses and run them.
    async fn freight_chain(&self, id: &EntityId, cancel: CancellationToken) -> ChainResult {
        let url = self.config.url(&self.config.endpoints.freight_detail, Some(id));
        let html = self.fetch_detail(url, &cancel).await.map_err(|e| {
            tracing::warn!("freight {id}: detail page failed: {e}");
            e.kind()
        })?;

        let Some(record) = self
            .extract_page(Domain::Freight, &html)
            .records
            .into_iter()
            .next()
        else {
            tracing::warn!("freight {id}: page carries no freight id");
            return Err(ErrorKind::MissingIdentifier);
        };
        self.record_chain(&record, &cancel).await
    }

    async fn fetch_detail(&self, url: String, cancel: &CancellationToken) -> Result<String, ActionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ActionError::Cancelled),
            page = self.fetch_page(url) => page.map_err(ActionError::from),
        }
    }
}

fn tally(report: &mut CycleReport, results: Vec<(EntityId, ChainResult)>) {
    report.processed += results.len();
    for (id, result) in results {
        match result {
            Ok(Some(_)) => report.acted += 1,
            Ok(None) => {}
            Err(kind) => {
                report.failures.insert(id, kind);
            }
        }
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}
