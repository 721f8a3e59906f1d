//! Leave requests and working-day counting.

pub mod days;
pub mod error;
pub mod types;

pub use days::{DayCount, MAX_REQUEST_SPAN_DAYS, count_days, is_working_day};
pub use error::RequestError;
pub use types::{EmergencyOverride, LeaveRequest, RequestStatus, SubmitRequestInput};
