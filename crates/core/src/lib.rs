pub mod calendar;
pub mod config;
pub mod currency;
pub mod domain;
pub mod errors;
pub mod rules;
pub mod snapshot;
pub mod summary;

pub use chrono;

pub use config::{AppConfig, ConfigError, DatabaseConfig, LoggingConfig};
pub use currency::{CurrencyConverter, RateTable};
pub use domain::engagement::{Engagement, EngagementId};
pub use domain::estimate::{
    next_version_name, Estimate, EstimateId, ReleaseId, INITIAL_ESTIMATE_NAME,
};
pub use domain::opportunity::{Opportunity, OpportunityId};
pub use domain::plan::{
    LineItemId, PhaseId, PlanLineItem, PlanPhase, ResourcePlan, WeeklyHours,
};
pub use domain::quote::{
    BillingUnit, CapType, PaymentTrigger, Quote, QuoteId, QuoteStatus, QuoteTypeConfig,
    TriggerKind, VariableCompensation,
};
pub use errors::{CurrencyError, DomainError};
pub use rules::validate_quote_config;
pub use snapshot::snapshot_plan;
pub use summary::{plan_totals, ComparativeSummary, PlanTotals};
