//! Ordering, short-circuit and cancellation behaviour of action chains,
//! driven by a scripted in-memory fetcher.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use logistics_autopilot::{
    Action, ActionError, AutopilotConfig, ButtonPress, Dispatcher, Employee, EntityId,
    EntityRecord, FetchRequest, FreightButton, FreightDetail, NetworkError, PageFetcher,
    RawResponse,
};

// ─────────────────────── helpers ───────────────────────

/// Canned answer for requests whose URL contains `needle`.
struct Route {
    needle: &'static str,
    delay: Duration,
    status: u16,
    body: &'static str,
}

/// Timing of one answered request.
#[derive(Debug, Clone)]
struct Call {
    url: String,
    started: Instant,
    finished: Instant,
}

/// Answers requests by URL substring after a fixed delay and records timing.
struct Scripted {
    routes: Vec<Route>,
    started: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
}

impl Scripted {
    fn new(routes: Vec<Route>) -> Arc<Self> {
        Arc::new(Self {
            routes,
            started: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for Scripted {
    async fn fetch(&self, request: FetchRequest) -> Result<RawResponse, NetworkError> {
        let started = Instant::now();
        self.started.lock().unwrap().push(request.url.clone());

        let Some(route) = self.routes.iter().find(|r| request.url.contains(r.needle)) else {
            return Err(NetworkError::new(request.url, "connection refused"));
        };
        tokio::time::sleep(route.delay).await;

        self.calls.lock().unwrap().push(Call {
            url: request.url.clone(),
            started,
            finished: Instant::now(),
        });
        Ok(RawResponse {
            url: request.url,
            status: route.status,
            body: route.body.to_string(),
        })
    }
}

/// 200 route answering after `delay_ms`.
fn route(needle: &'static str, delay_ms: u64, body: &'static str) -> Route {
    Route {
        needle,
        delay: Duration::from_millis(delay_ms),
        status: 200,
        body,
    }
}

/// Dispatcher over the scripted fetcher with default endpoints.
fn dispatcher(fetcher: &Arc<Scripted>) -> Dispatcher {
    Dispatcher::new(fetcher.clone(), Arc::new(AutopilotConfig::default()))
}

/// Idle employee at 45% sleep, so the sleep chain applies.
fn sleepy_employee() -> EntityRecord {
    EntityRecord::Employee(Employee {
        id: EntityId::parse("101").unwrap(),
        name: "Anna".into(),
        roster: "Truckers".into(),
        salary: "$1,000".into(),
        location: "Berlin".into(),
        sleep_percent: Some(45),
        id_card: None,
        action: "Nothing".into(),
        available: "Yes".into(),
        pallet: "-".into(),
    })
}

/// Freight record plus a press action for link buttons named by `labels`.
fn freight_with_presses(labels: &[&str]) -> (EntityRecord, Action) {
    let presses: Vec<ButtonPress> = labels
        .iter()
        .map(|label| ButtonPress {
            label: label.to_string(),
            button: FreightButton {
                tag: "a".into(),
                text: label.to_string(),
                onclick: None,
                href: Some(format!("ajax/freight_{label}.php?n=919")),
            },
        })
        .collect();
    let record = EntityRecord::Freight(FreightDetail {
        id: EntityId::parse("919").unwrap(),
        details: Vec::new(),
        financial_overview: Vec::new(),
        buttons: presses.iter().map(|p| p.button.clone()).collect(),
        status: Vec::new(),
    });
    (record, Action::PressButtons(presses))
}

// ─────────────────────── ordering ───────────────────────

#[tokio::test]
async fn test_sleep_trigger_waits_for_slow_visit() {
    let fetcher = Scripted::new(vec![
        route("employees_select", 150, "<html>profile</html>"),
        route("employee_sleep", 0, "ok"),
    ]);

    let outcome = dispatcher(&fetcher)
        .dispatch(&sleepy_employee(), &Action::Sleep, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.steps, 2);

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].url.contains("employees_select&e=101"));
    assert!(calls[1].url.contains("employee_sleep.php?e=101"));
    assert!(calls[1].started >= calls[0].finished);
}

#[tokio::test]
async fn test_freight_presses_run_in_plan_order() {
    let fetcher = Scripted::new(vec![
        route("a=freight", 80, "<html>freight</html>"),
        route("freight_random", 40, "ok"),
        route("freight_drive", 0, r#"{"error":"SUCCESS"}"#),
    ]);
    let (record, action) = freight_with_presses(&["random", "drive"]);

    let outcome = dispatcher(&fetcher)
        .dispatch(&record, &action, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.steps, 3);
    assert_eq!(outcome.code.as_deref(), Some("SUCCESS"));

    let calls = fetcher.calls();
    assert!(calls[0].url.contains("a=freight&n=919"));
    assert!(calls[1].url.contains("freight_random"));
    assert!(calls[2].url.contains("freight_drive"));
    for pair in calls.windows(2) {
        assert!(pair[1].started >= pair[0].finished);
    }
}

// ─────────────────────── short-circuit ───────────────────────

#[tokio::test]
async fn test_rejected_press_stops_the_chain() {
    let fetcher = Scripted::new(vec![
        route("a=freight", 0, "<html>freight</html>"),
        route("freight_load", 0, r#"{"error":"ERROR_NOT_LOADED","fullerror":"Cargo missing"}"#),
        route("freight_drive", 0, "ok"),
    ]);
    let (record, action) = freight_with_presses(&["load", "drive"]);

    let err = dispatcher(&fetcher)
        .dispatch(&record, &action, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ActionError::Rejected {
            code: "ERROR_NOT_LOADED".into(),
            message: "Cargo missing".into(),
        }
    );
    assert!(!fetcher.started().iter().any(|u| u.contains("freight_drive")));
}

#[tokio::test]
async fn test_failed_visit_never_triggers() {
    let fetcher = Scripted::new(vec![route("employee_sleep", 0, "ok")]);

    let err = dispatcher(&fetcher)
        .dispatch(&sleepy_employee(), &Action::Sleep, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Network(_)));
    assert_eq!(fetcher.started().len(), 1);
}

// ─────────────────────── cancellation ───────────────────────

#[tokio::test]
async fn test_cancelled_token_issues_no_request() {
    let fetcher = Scripted::new(vec![route("employees_select", 0, "ok")]);
    let token = CancellationToken::new();
    token.cancel();

    let err = dispatcher(&fetcher)
        .dispatch(&sleepy_employee(), &Action::Sleep, &token)
        .await
        .unwrap_err();
    assert_eq!(err, ActionError::Cancelled);
    assert!(fetcher.started().is_empty());
}

#[tokio::test]
async fn test_cancel_during_visit_stops_before_trigger() {
    let fetcher = Scripted::new(vec![
        route("employees_select", 2_000, "ok"),
        route("employee_sleep", 0, "ok"),
    ]);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let began = Instant::now();
    let err = dispatcher(&fetcher)
        .dispatch(&sleepy_employee(), &Action::Sleep, &token)
        .await
        .unwrap_err();

    assert_eq!(err, ActionError::Cancelled);
    assert!(began.elapsed() < Duration::from_millis(1_500));
    assert_eq!(fetcher.started().len(), 1);
    assert!(fetcher.calls().is_empty());
}
