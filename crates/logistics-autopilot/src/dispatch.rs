//! Turning an action into requests and judging the responses.
//!
//! Every action becomes an [`ActionPlan`]: an ordered list of steps, each a
//! request plus the check its response must pass. Steps run strictly one
//! after the other; a step is only issued once the previous one resolved, and
//! the chain stops at the first failure or when its token is cancelled.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::AutopilotConfig;
use crate::error::ActionError;
use crate::extract::freight::{button_target, ButtonTarget};
use crate::fetcher::{FetchRequest, PageFetcher, RawResponse};
use crate::types::{Action, ActionOutcome, ButtonPress, EntityRecord, VehicleKind};

/// How a step's response is judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCheck {
    /// Detail-page visit. Any response will do; only transport failure aborts.
    Visit,
    /// Body must be JSON whose `error` field is one of the accepted codes.
    Sentinel(Vec<String>),
    /// A JSON `error` field is sentinel-checked; any other body passes on 2xx.
    Lenient(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub request: FetchRequest,
    pub check: ResponseCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan {
    pub action: &'static str,
    pub steps: Vec<Step>,
}

/// What a passing step reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StepReport {
    code: Option<String>,
    message: Option<String>,
}

pub struct Dispatcher {
    fetcher: Arc<dyn PageFetcher>,
    config: Arc<AutopilotConfig>,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: Arc<AutopilotConfig>) -> Self {
        Self { fetcher, config }
    }

    /// Build the request chain for `action` on `record`. `None` if the action
    /// does not apply to that kind of record.
    pub fn plan(&self, record: &EntityRecord, action: &Action) -> Option<ActionPlan> {
        let cfg = &self.config;
        let ep = &cfg.endpoints;
        let id = record.id();
        let success = cfg.sentinels.success.clone();

        let steps = match (record, action) {
            (EntityRecord::Employee(_), Action::Sleep) => vec![
                Step {
                    request: FetchRequest::get(cfg.url(&ep.employee_detail, Some(id))),
                    check: ResponseCheck::Visit,
                },
                Step {
                    request: FetchRequest::get(cfg.url(&ep.employee_sleep, Some(id))),
                    check: ResponseCheck::Lenient(success),
                },
            ],
            (EntityRecord::Vehicle(vehicle), Action::Repair) => {
                let field = match vehicle.kind {
                    VehicleKind::Truck => "repairtruck",
                    VehicleKind::Trailer => "repairtrailer",
                };
                vec![Step {
                    request: FetchRequest::post_form(
                        cfg.url(&ep.repair, Some(id)),
                        vec![(field.to_string(), id.to_string())],
                    ),
                    check: ResponseCheck::Sentinel(success),
                }]
            }
            (EntityRecord::Fuel(_), Action::Refuel) => vec![Step {
                request: FetchRequest::get(cfg.url(&ep.refuel, Some(id))),
                check: ResponseCheck::Sentinel(success),
            }],
            (EntityRecord::Trip(_), Action::AcceptTrip) => {
                let mut accepted = success;
                accepted.extend(cfg.sentinels.trip_accepted.iter().cloned());
                vec![Step {
                    request: FetchRequest::post_form(
                        cfg.url(&ep.trip_accept, Some(id)),
                        vec![("freight[]".to_string(), id.to_string())],
                    ),
                    check: ResponseCheck::Sentinel(accepted),
                }]
            }
            (EntityRecord::Freight(_), Action::PressButtons(presses)) => {
                let mut steps = vec![Step {
                    request: FetchRequest::get(cfg.url(&ep.freight_detail, Some(id))),
                    check: ResponseCheck::Visit,
                }];
                steps.extend(presses.iter().map(|press| Step {
                    request: self.press_request(id.as_str(), press),
                    check: ResponseCheck::Lenient(success.clone()),
                }));
                steps
            }
            _ => return None,
        };

        Some(ActionPlan {
            action: action.name(),
            steps,
        })
    }

    fn press_request(&self, freight_id: &str, press: &ButtonPress) -> FetchRequest {
        match button_target(&press.button) {
            ButtonTarget::Link(link) => FetchRequest::get(self.config.url(&link, None)),
            ButtonTarget::FormAction => FetchRequest::post_form(
                self.config.url(&self.config.endpoints.freight_action, None),
                vec![
                    ("freight".to_string(), freight_id.to_string()),
                    ("action".to_string(), press.label.clone()),
                ],
            ),
        }
    }

    /// Plan and run `action` for `record`.
    pub async fn dispatch(
        &self,
        record: &EntityRecord,
        action: &Action,
        cancel: &CancellationToken,
    ) -> Result<ActionOutcome, ActionError> {
        let plan = self
            .plan(record, action)
            .ok_or(ActionError::NotApplicable {
                entity: record.kind(),
                action: action.name(),
            })?;
        self.run_plan(record, plan, cancel).await
    }

    /// Run a plan strictly in order, stopping at the first failing step.
    pub async fn run_plan(
        &self,
        record: &EntityRecord,
        plan: ActionPlan,
        cancel: &CancellationToken,
    ) -> Result<ActionOutcome, ActionError> {
        let mut last = StepReport::default();
        let total = plan.steps.len();

        for (index, step) in plan.steps.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ActionError::Cancelled);
            }

            tracing::debug!(
                "{} {} step {}/{}: {}",
                plan.action,
                record.id(),
                index + 1,
                total,
                step.request.url
            );
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ActionError::Cancelled),
                result = self.fetcher.fetch(step.request) => result?,
            };
            last = check_response(&step.check, &response)?;
        }

        Ok(ActionOutcome {
            entity: record.id().clone(),
            action: plan.action.to_string(),
            steps: total,
            code: last.code,
            message: last.message,
        })
    }
}

fn check_response(check: &ResponseCheck, response: &RawResponse) -> Result<StepReport, ActionError> {
    match check {
        ResponseCheck::Visit => Ok(StepReport::default()),
        ResponseCheck::Sentinel(accepted) => {
            let json: Value = serde_json::from_str(response.body.trim()).map_err(|e| {
                ActionError::Parse(format!("HTTP {} with non-JSON body: {e}", response.status))
            })?;
            match sentinel(&json) {
                Some(report) => judge(report, accepted),
                None => Err(ActionError::Parse(format!(
                    "HTTP {} without an error field",
                    response.status
                ))),
            }
        }
        ResponseCheck::Lenient(accepted) => {
            let report = serde_json::from_str::<Value>(response.body.trim())
                .ok()
                .and_then(|json| sentinel(&json));
            match report {
                Some(report) => judge(report, accepted),
                None if response.is_success() => Ok(StepReport::default()),
                None => Err(ActionError::Rejected {
                    code: format!("HTTP {}", response.status),
                    message: String::new(),
                }),
            }
        }
    }
}

/// `error` / `fullerror` of a JSON response body, if it has an `error` string.
fn sentinel(json: &Value) -> Option<StepReport> {
    let code = json.get("error")?.as_str()?.to_string();
    let message = json
        .get("fullerror")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(StepReport {
        code: Some(code),
        message,
    })
}

fn judge(report: StepReport, accepted: &[String]) -> Result<StepReport, ActionError> {
    let code = report.code.clone().unwrap_or_default();
    if accepted.iter().any(|a| *a == code) {
        Ok(report)
    } else {
        Err(ActionError::Rejected {
            code,
            message: report.message.unwrap_or_default(),
        })
    }
}
