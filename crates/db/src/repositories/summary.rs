use std::sync::Arc;

use staffquote_core::{
    plan_totals, ComparativeSummary, CurrencyConverter, EngagementId, PlanTotals, QuoteTypeConfig,
};

use super::engagement::require_engagement;
use super::plan::{self, ENGAGEMENT_PLAN, ESTIMATE_PLAN, QUOTE_PLAN};
use super::quote::{require_opportunity, require_quote};
use super::RepositoryError;
use crate::DbPool;

/// Reads one engagement's full chain (engagement -> quote -> opportunity ->
/// estimate) and reports deviations in the opportunity's currency.
pub struct SqlSummaryService {
    pool: DbPool,
    rates: Arc<dyn CurrencyConverter>,
}

impl SqlSummaryService {
    pub fn new(pool: DbPool, rates: Arc<dyn CurrencyConverter>) -> Self {
        Self { pool, rates }
    }

    /// The comparative summary for a derived engagement.
    ///
    /// The quote amount is the fixed-bid target, or the quote's frozen plan
    /// revenue for time-and-materials. Estimate totals come from the live
    /// estimate plan, so later estimate edits show up as deviation.
    pub async fn compute(
        &self,
        engagement_id: &EngagementId,
    ) -> Result<ComparativeSummary, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let engagement = require_engagement(&mut conn, engagement_id).await?;
        let quote = require_quote(&mut conn, &engagement.quote_id).await?;
        let opportunity = require_opportunity(&mut conn, &quote.opportunity_id).await?;
        let currency = opportunity.currency.as_str();

        let quote_amount = match &quote.config {
            QuoteTypeConfig::FixedBid { target_amount, .. } => *target_amount,
            QuoteTypeConfig::TimeMaterials { .. } => {
                let quote_plan = plan::load_plan(&mut conn, &QUOTE_PLAN, &quote.id.0).await?;
                plan_totals(&quote_plan.line_items, currency, self.rates.as_ref())?.revenue
            }
        };

        let estimate_plan =
            plan::load_plan(&mut conn, &ESTIMATE_PLAN, &quote.estimate_id.0).await?;
        let estimate_totals =
            plan_totals(&estimate_plan.line_items, currency, self.rates.as_ref())?;

        let engagement_plan =
            plan::load_plan(&mut conn, &ENGAGEMENT_PLAN, &engagement_id.0).await?;
        let engagement_totals =
            plan_totals(&engagement_plan.line_items, currency, self.rates.as_ref())?;

        tracing::debug!(
            engagement_id = %engagement_id.0,
            currency,
            quote_amount = %quote_amount,
            engagement_revenue = %engagement_totals.revenue,
            "comparative summary computed"
        );

        Ok(ComparativeSummary::compute(currency, quote_amount, estimate_totals, engagement_totals))
    }

    /// Rollup for one stored plan family member, used by the plan editors'
    /// footers. `totals_for_*` never touch the quote amount.
    pub async fn estimate_totals(
        &self,
        estimate_id: &staffquote_core::EstimateId,
        currency: &str,
    ) -> Result<PlanTotals, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let plan = plan::load_plan(&mut conn, &ESTIMATE_PLAN, &estimate_id.0).await?;
        Ok(plan_totals(&plan.line_items, currency, self.rates.as_ref())?)
    }

    pub async fn engagement_totals(
        &self,
        engagement_id: &EngagementId,
        currency: &str,
    ) -> Result<PlanTotals, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let plan = plan::load_plan(&mut conn, &ENGAGEMENT_PLAN, &engagement_id.0).await?;
        Ok(plan_totals(&plan.line_items, currency, self.rates.as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use staffquote_core::{
        BillingUnit, CapType, PaymentTrigger, QuoteStatus, QuoteTypeConfig, RateTable, TriggerKind,
    };

    use super::SqlSummaryService;
    use crate::fixtures::{sample_plan, seed_opportunity, seed_release};
    use crate::repositories::engagement::SqlEngagementRepository;
    use crate::repositories::estimate::SqlEstimateRepository;
    use crate::repositories::quote::{QuoteCreateInput, SqlQuoteRepository};
    use crate::test_support::setup_pool;
    use crate::DbPool;

    async fn derive_engagement(
        pool: &DbPool,
        suffix: &str,
        currency: &str,
        config: QuoteTypeConfig,
    ) -> staffquote_core::EngagementId {
        let release = seed_release(pool, &format!("rel-{suffix}")).await;
        let opportunity =
            seed_opportunity(pool, &release, &format!("opp-{suffix}"), currency).await;

        let estimates = SqlEstimateRepository::new(pool.clone());
        let estimate = estimates.create_draft(&release, None, None).await.expect("estimate");
        estimates.save_plan(&estimate.id, &sample_plan()).await.expect("save plan");

        let quotes = SqlQuoteRepository::new(pool.clone());
        let quote = quotes
            .create(QuoteCreateInput {
                opportunity_id: opportunity,
                estimate_id: estimate.id,
                config,
                variable_compensations: vec![],
                created_by: None,
            })
            .await
            .expect("create quote");
        quotes.update_status(&quote.id, QuoteStatus::Accepted, None, None).await.expect("accept");

        SqlEngagementRepository::new(pool.clone())
            .find_by_quote(&quote.id)
            .await
            .expect("find engagement")
            .expect("engagement derived")
            .id
    }

    fn fixed_bid(target: i64) -> QuoteTypeConfig {
        QuoteTypeConfig::FixedBid {
            target_amount: Decimal::from(target),
            payment_triggers: vec![PaymentTrigger {
                kind: TriggerKind::Time,
                amount: Decimal::from(target),
                installment_count: None,
                due_date: None,
                sort_order: 0,
            }],
        }
    }

    #[tokio::test]
    async fn fixed_bid_summary_matches_the_reference_scenario() {
        let pool = setup_pool().await;
        let engagement_id = derive_engagement(&pool, "sum-001", "USD", fixed_bid(9000)).await;

        let service = SqlSummaryService::new(pool.clone(), Arc::new(RateTable::new()));
        let summary = service.compute(&engagement_id).await.expect("summary");

        assert_eq!(summary.currency, "USD");
        assert_eq!(summary.quote_amount, Decimal::from(9000));
        assert_eq!(summary.estimate.revenue, Decimal::from(8000));
        assert_eq!(summary.estimate.cost, Decimal::from(4800));
        assert_eq!(summary.estimate.margin_percent, Decimal::new(375, 1));
        assert_eq!(summary.engagement.revenue, Decimal::from(8000));
        assert_eq!(summary.revenue_deviation, Decimal::from(-1000));
        assert_eq!(summary.revenue_deviation_percent.round_dp(1), Decimal::new(-111, 1));
        assert_eq!(summary.margin_percent_deviation, Decimal::ZERO);

        pool.close().await;
    }

    #[tokio::test]
    async fn time_materials_quote_amount_is_frozen_plan_revenue() {
        let pool = setup_pool().await;
        let engagement_id = derive_engagement(
            &pool,
            "sum-002",
            "USD",
            QuoteTypeConfig::TimeMaterials {
                billing_unit: BillingUnit::Hourly,
                blended_rate: None,
                cap_type: CapType::None,
                cap_amount: None,
            },
        )
        .await;

        let service = SqlSummaryService::new(pool.clone(), Arc::new(RateTable::new()));
        let summary = service.compute(&engagement_id).await.expect("summary");

        assert_eq!(summary.quote_amount, Decimal::from(8000));
        assert_eq!(summary.revenue_deviation, Decimal::ZERO);
        assert_eq!(summary.revenue_deviation_percent, Decimal::ZERO);

        pool.close().await;
    }

    #[tokio::test]
    async fn engagement_edits_show_up_as_deviation() {
        let pool = setup_pool().await;
        let engagement_id = derive_engagement(&pool, "sum-003", "USD", fixed_bid(9000)).await;

        let engagements = SqlEngagementRepository::new(pool.clone());
        let mut plan = engagements.load_plan(&engagement_id).await.expect("plan");
        plan.line_items[0].weekly_hours.pop();
        engagements.save_plan(&engagement_id, &plan).await.expect("save plan");

        let service = SqlSummaryService::new(pool.clone(), Arc::new(RateTable::new()));
        let summary = service.compute(&engagement_id).await.expect("summary");

        // One 40-hour week dropped: engagement revenue 4000 vs target 9000.
        assert_eq!(summary.engagement.revenue, Decimal::from(4000));
        assert_eq!(summary.revenue_deviation, Decimal::from(-5000));
        assert_eq!(summary.estimate.revenue, Decimal::from(8000));

        pool.close().await;
    }

    #[tokio::test]
    async fn line_items_convert_into_the_opportunity_currency() {
        let pool = setup_pool().await;
        // Plan line items are in USD; the opportunity reports in EUR.
        let engagement_id = derive_engagement(&pool, "sum-004", "EUR", fixed_bid(9000)).await;

        let rates = RateTable::new().with_rate("USD", "EUR", Decimal::new(9, 1));
        let service = SqlSummaryService::new(pool.clone(), Arc::new(rates));
        let summary = service.compute(&engagement_id).await.expect("summary");

        assert_eq!(summary.currency, "EUR");
        assert_eq!(summary.estimate.revenue, Decimal::from(7200));
        assert_eq!(summary.estimate.cost, Decimal::from(4320));
        // Margin percent is scale-free.
        assert_eq!(summary.estimate.margin_percent, Decimal::new(375, 1));

        pool.close().await;
    }

    #[tokio::test]
    async fn missing_rate_is_reported_not_defaulted() {
        let pool = setup_pool().await;
        let engagement_id = derive_engagement(&pool, "sum-005", "GBP", fixed_bid(9000)).await;

        let service = SqlSummaryService::new(pool.clone(), Arc::new(RateTable::new()));
        let error = service.compute(&engagement_id).await.expect_err("no USD->GBP rate");
        assert!(matches!(
            error,
            crate::repositories::RepositoryError::Currency(
                staffquote_core::CurrencyError::MissingRate { .. }
            )
        ));

        pool.close().await;
    }

    #[tokio::test]
    async fn zero_revenue_engagement_reports_zero_margin_percent() {
        let pool = setup_pool().await;
        let engagement_id = derive_engagement(&pool, "sum-006", "USD", fixed_bid(9000)).await;

        let engagements = SqlEngagementRepository::new(pool.clone());
        let mut plan = engagements.load_plan(&engagement_id).await.expect("plan");
        plan.line_items[0].billable = false;
        engagements.save_plan(&engagement_id, &plan).await.expect("save plan");

        let service = SqlSummaryService::new(pool.clone(), Arc::new(RateTable::new()));
        let summary = service.compute(&engagement_id).await.expect("summary");

        assert_eq!(summary.engagement.revenue, Decimal::ZERO);
        assert_eq!(summary.engagement.cost, Decimal::from(4800));
        assert_eq!(summary.engagement.margin_percent, Decimal::ZERO);

        pool.close().await;
    }
}
