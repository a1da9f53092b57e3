//! Client binding for the PagerDuty automation actions runner API.
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod runners;

pub use client::{Client, HttpTransport, Response, Transport};
pub use config::Config;
pub use error::{ApiErrorBody, Error, Result};
pub use models::{
    AutomationActionsPrivileges, AutomationActionsRunner, AutomationActionsRunnerPayload,
    ListRunnersOptions, ListRunnersResponse, Payload, Resource, RunnerType, TeamReference,
};
pub use runners::AutomationActionsRunnerService;
