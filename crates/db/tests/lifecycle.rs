//! End-to-end lifecycle coverage: estimate versioning, quoting, acceptance,
//! engagement derivation, and the comparative summary, driven through the
//! public repository API the way a request handler would.

use std::sync::Arc;

use rust_decimal::Decimal;

use staffquote_core::{
    PaymentTrigger, QuoteStatus, QuoteTypeConfig, RateTable, TriggerKind, INITIAL_ESTIMATE_NAME,
};
use staffquote_db::{
    connect_with_settings, migrations, DbPool, QuoteCreateInput, RepositoryError,
    SqlEngagementRepository, SqlEstimateRepository, SqlQuoteRepository, SqlSummaryService,
};

async fn setup_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
        .await
        .expect("connect test pool");
    migrations::run_pending(&pool).await.expect("run migrations");
    pool
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
async fn quote_to_engagement_reference_flow() {
    let pool = setup_pool().await;
    let release = staffquote_db::fixtures::seed_release(&pool, "rel-flow").await;
    let opportunity =
        staffquote_db::fixtures::seed_opportunity(&pool, &release, "opp-flow", "USD").await;

    let estimates = SqlEstimateRepository::new(pool.clone());
    let estimate = estimates
        .create_draft(&release, Some(INITIAL_ESTIMATE_NAME), Some("ana"))
        .await
        .expect("initial estimate");
    estimates
        .save_plan(&estimate.id, &staffquote_db::fixtures::sample_plan())
        .await
        .expect("staff the estimate");

    let quotes = SqlQuoteRepository::new(pool.clone());
    let quote = quotes
        .create(QuoteCreateInput {
            opportunity_id: opportunity.clone(),
            estimate_id: estimate.id.clone(),
            config: fixed_bid(9000),
            variable_compensations: vec![],
            created_by: Some("ana".to_string()),
        })
        .await
        .expect("create quote");
    assert_eq!(quote.quote_number, "opp-flow-Q001");

    // While the quote is active the opportunity is locked for edits.
    let lock_error = quotes.ensure_unlocked(&opportunity).await.expect_err("locked");
    assert!(matches!(lock_error, RepositoryError::Domain(_)));

    quotes
        .update_status(&quote.id, QuoteStatus::Sent, None, Some("ana"))
        .await
        .expect("send");
    let accepted = quotes
        .update_status(&quote.id, QuoteStatus::Accepted, None, Some("client"))
        .await
        .expect("accept");
    assert_eq!(accepted.status, QuoteStatus::Accepted);

    let engagements = SqlEngagementRepository::new(pool.clone());
    let engagement = engagements
        .find_by_quote(&quote.id)
        .await
        .expect("query engagement")
        .expect("derived on acceptance");
    assert_eq!(engagement.name, "opp-flow-Q001");

    let plan = engagements.load_plan(&engagement.id).await.expect("engagement plan");
    assert_eq!(plan.line_items.len(), 1);
    assert_eq!(plan.line_items[0].total_hours(), Decimal::from(80));

    let summaries = SqlSummaryService::new(pool.clone(), Arc::new(RateTable::new()));
    let summary = summaries.compute(&engagement.id).await.expect("summary");
    assert_eq!(summary.quote_amount, Decimal::from(9000));
    assert_eq!(summary.estimate.revenue, Decimal::from(8000));
    assert_eq!(summary.estimate.margin_percent, Decimal::new(375, 1));
    assert_eq!(summary.revenue_deviation, Decimal::from(-1000));
    assert_eq!(summary.revenue_deviation_percent.round_dp(1), Decimal::new(-111, 1));

    let history = quotes.status_history(&quote.id).await.expect("history");
    let statuses: Vec<_> = history.iter().map(|entry| entry.to_status).collect();
    assert_eq!(
        statuses,
        vec![QuoteStatus::Draft, QuoteStatus::Sent, QuoteStatus::Accepted],
    );

    pool.close().await;
}

#[tokio::test]
async fn superseding_an_accepted_quote_cascades_to_its_engagement() {
    let pool = setup_pool().await;
    let release = staffquote_db::fixtures::seed_release(&pool, "rel-cascade").await;
    let opportunity =
        staffquote_db::fixtures::seed_opportunity(&pool, &release, "opp-cascade", "USD").await;

    let estimates = SqlEstimateRepository::new(pool.clone());
    let estimate = estimates.create_draft(&release, None, None).await.expect("estimate");
    estimates
        .save_plan(&estimate.id, &staffquote_db::fixtures::sample_plan())
        .await
        .expect("staff the estimate");

    let quotes = SqlQuoteRepository::new(pool.clone());
    let first = quotes
        .create(QuoteCreateInput {
            opportunity_id: opportunity.clone(),
            estimate_id: estimate.id.clone(),
            config: fixed_bid(9000),
            variable_compensations: vec![],
            created_by: None,
        })
        .await
        .expect("first quote");
    quotes
        .update_status(&first.id, QuoteStatus::Accepted, None, None)
        .await
        .expect("accept first");

    let engagements = SqlEngagementRepository::new(pool.clone());
    assert!(engagements.find_by_quote(&first.id).await.expect("query").is_some());

    let second = quotes
        .create(QuoteCreateInput {
            opportunity_id: opportunity.clone(),
            estimate_id: estimate.id,
            config: fixed_bid(9500),
            variable_compensations: vec![],
            created_by: None,
        })
        .await
        .expect("second quote");
    assert_eq!(second.version, 2);

    let first = quotes.find_by_id(&first.id).await.expect("reload").expect("present");
    assert_eq!(first.status, QuoteStatus::Invalid);
    assert!(!first.is_active);
    assert!(engagements.find_by_quote(&first.id).await.expect("query").is_none());

    let active = quotes.check_active_quote(&opportunity).await.expect("active quote");
    assert_eq!(active.map(|quote| quote.id), Some(second.id));

    pool.close().await;
}

#[tokio::test]
async fn estimate_versions_branch_and_swap_without_touching_quotes() {
    let pool = setup_pool().await;
    let release = staffquote_db::fixtures::seed_release(&pool, "rel-versions").await;
    staffquote_db::fixtures::seed_opportunity(&pool, &release, "opp-versions", "USD").await;

    let estimates = SqlEstimateRepository::new(pool.clone());
    let initial = estimates
        .create_draft(&release, Some(INITIAL_ESTIMATE_NAME), None)
        .await
        .expect("initial");
    estimates
        .save_plan(&initial.id, &staffquote_db::fixtures::sample_plan())
        .await
        .expect("staff initial");

    let second = estimates.create_draft(&release, None, None).await.expect("second");
    let third = estimates.create_draft(&release, None, None).await.expect("third");
    assert_eq!(second.name, "VERSION 2");
    assert_eq!(third.name, "VERSION 3");

    // Branching copies the active plan into the draft.
    let branched = estimates.load_plan(&second.id).await.expect("branched plan");
    assert_eq!(branched.line_items.len(), 1);

    estimates.activate(&third.id).await.expect("activate third");
    let active = estimates.get_active(&release).await.expect("active");
    assert_eq!(active.map(|estimate| estimate.id), Some(third.id));

    pool.close().await;
}

#[tokio::test]
async fn rejecting_a_sent_quote_frees_the_opportunity() {
    let pool = setup_pool().await;
    let release = staffquote_db::fixtures::seed_release(&pool, "rel-reject").await;
    let opportunity =
        staffquote_db::fixtures::seed_opportunity(&pool, &release, "opp-reject", "USD").await;

    let estimates = SqlEstimateRepository::new(pool.clone());
    let estimate = estimates.create_draft(&release, None, None).await.expect("estimate");
    estimates
        .save_plan(&estimate.id, &staffquote_db::fixtures::sample_plan())
        .await
        .expect("staff the estimate");

    let quotes = SqlQuoteRepository::new(pool.clone());
    let quote = quotes
        .create(QuoteCreateInput {
            opportunity_id: opportunity.clone(),
            estimate_id: estimate.id.clone(),
            config: fixed_bid(9000),
            variable_compensations: vec![],
            created_by: None,
        })
        .await
        .expect("create quote");

    quotes.update_status(&quote.id, QuoteStatus::Sent, None, None).await.expect("send");
    let rejected = quotes
        .update_status(&quote.id, QuoteStatus::Rejected, None, Some("client"))
        .await
        .expect("reject");
    assert!(!rejected.is_active);

    quotes.ensure_unlocked(&opportunity).await.expect("unlocked after rejection");

    // A fresh quote starts the next version.
    let next = quotes
        .create(QuoteCreateInput {
            opportunity_id: opportunity,
            estimate_id: estimate.id,
            config: fixed_bid(8500),
            variable_compensations: vec![],
            created_by: None,
        })
        .await
        .expect("next quote");
    assert_eq!(next.version, 2);

    // Rejection is preserved as the audit value, not rewritten to invalid.
    let rejected = quotes.find_by_id(&quote.id).await.expect("reload").expect("present");
    assert_eq!(rejected.status, QuoteStatus::Rejected);

    pool.close().await;
}
