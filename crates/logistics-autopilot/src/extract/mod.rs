//! Page extractors.
//!
//! Each submodule turns one server-rendered page into typed records. None of
//! them fail: a missing section is an empty result and a row without a
//! recognizable id is counted in [`Extracted::missing_ids`] instead of being
//! defaulted.

pub mod employees;
pub mod freight;
pub mod fuel;
pub mod garage;
pub mod progress;
pub mod text;
pub mod trips;
pub mod warehouse;

use serde::Serialize;

pub use employees::extract_employees;
pub use freight::{button_target, extract_freight, ButtonTarget};
pub use fuel::extract_fuel;
pub use garage::{extract_garage, extract_vehicle_detail};
pub use progress::ProgressBar;
pub use trips::extract_trips;
pub use warehouse::extract_warehouse;

/// Records found on a page plus the number of candidate blocks dropped for
/// lack of an id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extracted<T> {
    pub records: Vec<T>,
    pub missing_ids: usize,
}

impl<T> Default for Extracted<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            missing_ids: 0,
        }
    }
}

impl<T> Extracted<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Extracted<U> {
        Extracted {
            records: self.records.into_iter().map(f).collect(),
            missing_ids: self.missing_ids,
        }
    }
}
