//! Logistics autopilot: fetches game pages, extracts typed entities, decides
//! which ones need attention and dispatches the matching action requests.

pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod extract;
pub mod fetcher;
pub mod session;
pub mod types;

pub use config::{resolve_config_path, AutopilotConfig};
pub use cycle::{Autopilot, CycleReport, Domain};
pub use dispatch::{ActionPlan, Dispatcher, ResponseCheck, Step};
pub use error::{ActionError, ConfigError, ErrorKind, NetworkError};
pub use evaluate::{denotes_available, Evaluator};
pub use extract::Extracted;
pub use fetcher::{FetchRequest, HttpFetcher, Method, PageFetcher, RawResponse};
pub use session::{DetailViewOrchestrator, NoopOrchestrator, SessionOrchestrator, ViewHandle};
pub use types::*;
