//! Application configuration management.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppResult;
use crate::types::{DepartmentId, LeaveTypeId, PositionId, UserId};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Leave accounting settings.
    #[serde(default)]
    pub leave: LeaveConfig,
    /// Static org chart served by the read-only directory.
    #[serde(default)]
    pub directory: Vec<DirectoryEntry>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Leave accounting settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaveConfig {
    /// Working hours in one leave day.
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: Decimal,
    /// Minimum hours between two reminders for the same approval.
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_hours: i64,
}

impl Default for LeaveConfig {
    fn default() -> Self {
        Self {
            hours_per_day: default_hours_per_day(),
            reminder_interval_hours: default_reminder_interval(),
        }
    }
}

fn default_hours_per_day() -> Decimal {
    Decimal::from(8)
}

fn default_reminder_interval() -> i64 {
    24
}

/// One employee in the static org chart.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    /// The employee.
    pub user_id: UserId,
    /// Direct supervisor, if any.
    #[serde(default)]
    pub supervisor_id: Option<UserId>,
    /// Department membership.
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    /// Position held.
    #[serde(default)]
    pub position_id: Option<PositionId>,
    /// Hire date used for service-year bonuses.
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    /// Approval ceiling (in days) applied to every leave type without an explicit limit.
    #[serde(default)]
    pub default_approval_limit: Option<Decimal>,
    /// Per leave type approval ceilings.
    #[serde(default)]
    pub approval_limits: Vec<ApprovalLimitEntry>,
}

/// Approval ceiling for one leave type.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalLimitEntry {
    /// Leave type the ceiling applies to.
    pub leave_type_id: LeaveTypeId,
    /// Maximum request length, in days, the supervisor may approve alone.
    pub max_days: Decimal,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a source is malformed or a required
    /// key (such as `jwt.secret`) is missing.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ACCRUE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
