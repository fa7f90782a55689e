//! KPI Service
//!
//! Derives an account summary from one page of aggregator transactions.
//!
//! Rules by account category:
//! - pension fund: balance is the sum of the fund balances; contributions,
//!   gain and return rate are derived from processed flows
//! - credit card, loan, anything else: processed/pending flow totals;
//!   snapshot balance, or the processed net flow when the snapshot has none
//!
//! Pending transactions only ever feed the `*_pending` fields.

use crate::aggregator::types::{
    page_results, AccountCategory, AccountSnapshot, FlowDirection, SettlementStatus, Transaction,
};
use crate::error::Result;
use crate::state::AppState;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Computed account summary
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountSummary {
    pub balance: f64,
    pub inflow_total: f64,
    pub inflow_pending: f64,
    pub outflow_total: f64,
    pub outflow_pending: f64,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub net_contributions: f64,
    pub net_gain: f64,
    pub return_rate: f64,
    pub transactions: Vec<Value>,
}

/// Processed and pending sums per direction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct FlowTotals {
    inflow_total: f64,
    inflow_pending: f64,
    outflow_total: f64,
    outflow_pending: f64,
}

impl FlowTotals {
    fn from_transactions(transactions: &[Transaction]) -> Self {
        let sum = |direction, status, f: fn(f64) -> f64| -> f64 {
            transactions
                .iter()
                .filter(|tx| tx.is(direction, status))
                .map(|tx| f(tx.amount()))
                .sum()
        };

        Self {
            inflow_total: sum(FlowDirection::Inflow, SettlementStatus::Processed, |a| a),
            inflow_pending: sum(FlowDirection::Inflow, SettlementStatus::Pending, |a| a),
            outflow_total: sum(FlowDirection::Outflow, SettlementStatus::Processed, f64::abs),
            outflow_pending: sum(FlowDirection::Outflow, SettlementStatus::Pending, f64::abs),
        }
    }
}

/// KPI service for business logic
pub struct KpiService;

impl KpiService {
    /// Compute the summary of an account under a link
    pub async fn compute_kpis(
        state: &AppState,
        account_id: &str,
        link_id: &str,
    ) -> Result<AccountSummary> {
        info!("KpiService::compute_kpis - account {} link {}", account_id, link_id);

        let page_size = state.config.aggregator.transactions_page_size;
        let payload = state
            .aggregator
            .list_transactions(account_id, link_id, page_size)
            .await?;
        let transactions = page_results(&payload);

        if transactions.is_empty() {
            info!("No transactions for {}, reading the account resource", account_id);
            let account = state.aggregator.get_account(account_id).await?;
            return Ok(Self::summarize_account(&AccountSnapshot::from_value(&account)));
        }

        Ok(Self::summarize(transactions))
    }

    /// Summary for an account without transactions
    pub fn summarize_account(account: &AccountSnapshot) -> AccountSummary {
        let balance = match account.account_category() {
            AccountCategory::PensionFund => account.funds_total(),
            _ => account.current_balance().unwrap_or(0.0),
        };

        AccountSummary {
            balance,
            inflow_total: 0.0,
            inflow_pending: 0.0,
            outflow_total: 0.0,
            outflow_pending: 0.0,
            currency: account.currency.clone(),
            category: account.category.clone(),
            net_contributions: 0.0,
            net_gain: 0.0,
            return_rate: 0.0,
            transactions: Vec::new(),
        }
    }

    /// Summary over a non-empty transaction page.
    ///
    /// The account snapshot of the first transaction provides category,
    /// currency and balances.
    pub fn summarize(raw: Vec<Value>) -> AccountSummary {
        let transactions: Vec<Transaction> = raw.iter().map(Transaction::from_value).collect();
        let account = transactions
            .first()
            .and_then(|tx| tx.account.clone())
            .unwrap_or_default();

        let mut summary = AccountSummary {
            balance: 0.0,
            inflow_total: 0.0,
            inflow_pending: 0.0,
            outflow_total: 0.0,
            outflow_pending: 0.0,
            currency: account.currency.clone(),
            category: account.category.clone(),
            net_contributions: 0.0,
            net_gain: 0.0,
            return_rate: 0.0,
            transactions: Vec::new(),
        };

        let flows = FlowTotals::from_transactions(&transactions);

        match account.account_category() {
            AccountCategory::PensionFund => {
                let balance = account.funds_total();
                let net_contributions = flows.inflow_total - flows.outflow_total;
                let net_gain = balance - net_contributions;

                summary.balance = balance;
                summary.net_contributions = net_contributions;
                summary.net_gain = net_gain;
                summary.return_rate = if net_contributions > 0.0 {
                    net_gain / net_contributions * 100.0
                } else {
                    0.0
                };
            }
            _ => {
                summary.inflow_total = flows.inflow_total;
                summary.inflow_pending = flows.inflow_pending;
                summary.outflow_total = flows.outflow_total;
                summary.outflow_pending = flows.outflow_pending;
                summary.balance = account
                    .current_balance()
                    .unwrap_or(flows.inflow_total - flows.outflow_total);
            }
        }

        summary.transactions = raw;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::mock::MockAggregator;
    use crate::error::AppError;
    use crate::state::testing::test_state;
    use serde_json::json;
    use std::sync::Arc;

    fn tx(kind: &str, status: &str, amount: f64, account: &Value) -> Value {
        json!({"id": format!("{kind}-{status}-{amount}"), "type": kind, "status": status,
               "amount": amount, "account": account})
    }

    #[test]
    fn test_pension_scenario() {
        let account = json!({
            "category": "PENSION_FUND_ACCOUNT",
            "currency": "BRL",
            "funds_data": [{"balance": 100}, {"balance": 50}]
        });
        let summary = KpiService::summarize(vec![
            tx("INFLOW", "PROCESSED", 200.0, &account),
            tx("OUTFLOW", "PROCESSED", 50.0, &account),
        ]);

        assert_eq!(summary.balance, 150.0);
        assert_eq!(summary.net_contributions, 150.0);
        assert_eq!(summary.net_gain, 0.0);
        assert_eq!(summary.return_rate, 0.0);
        assert_eq!(summary.category.as_deref(), Some("PENSION_FUND_ACCOUNT"));
        assert_eq!(summary.transactions.len(), 2);
    }

    #[test]
    fn test_pension_return_rate() {
        let account = json!({"category": "PENSION_FUND_ACCOUNT", "funds_data": [{"balance": 1100}]});
        let summary = KpiService::summarize(vec![
            tx("INFLOW", "PROCESSED", 1000.0, &account),
            tx("INFLOW", "PENDING", 500.0, &account),
        ]);

        assert_eq!(summary.net_contributions, 1000.0);
        assert_eq!(summary.net_gain, 100.0);
        assert!((summary.return_rate - 10.0).abs() < 1e-9);
        assert_eq!(summary.inflow_total, 0.0);
    }

    #[test]
    fn test_pension_without_contributions_has_zero_return() {
        let account = json!({"category": "PENSION_FUND_ACCOUNT", "funds_data": [{"balance": 80}]});
        let summary = KpiService::summarize(vec![tx("OUTFLOW", "PROCESSED", -20.0, &account)]);

        assert_eq!(summary.net_contributions, -20.0);
        assert_eq!(summary.net_gain, 100.0);
        assert_eq!(summary.return_rate, 0.0);
    }

    #[test]
    fn test_checking_uses_snapshot_balance() {
        let account = json!({"category": "CHECKING_ACCOUNT", "currency": "MXN",
                             "balance": {"current": 1234.5}});
        let summary = KpiService::summarize(vec![
            tx("INFLOW", "PROCESSED", 100.0, &account),
            tx("INFLOW", "PENDING", 40.0, &account),
            tx("OUTFLOW", "PROCESSED", -30.0, &account),
            tx("OUTFLOW", "PENDING", 10.0, &account),
            tx("OUTFLOW", "CANCELLED", 999.0, &account),
        ]);

        assert_eq!(summary.balance, 1234.5);
        assert_eq!(summary.inflow_total, 100.0);
        assert_eq!(summary.inflow_pending, 40.0);
        assert_eq!(summary.outflow_total, 30.0);
        assert_eq!(summary.outflow_pending, 10.0);
        assert_eq!(summary.currency.as_deref(), Some("MXN"));
        assert_eq!(summary.net_contributions, 0.0);
        assert_eq!(summary.return_rate, 0.0);
    }

    #[test]
    fn test_savings_without_balance_uses_net_processed_flow() {
        let account = json!({"category": "SAVINGS_ACCOUNT", "currency": "COP"});
        let summary = KpiService::summarize(vec![
            tx("INFLOW", "PROCESSED", 500.0, &account),
            tx("OUTFLOW", "PROCESSED", 120.0, &account),
            tx("INFLOW", "PENDING", 1000.0, &account),
        ]);

        assert_eq!(summary.balance, 380.0);
        assert_eq!(summary.inflow_total, 500.0);
        assert_eq!(summary.inflow_pending, 1000.0);
    }

    #[test]
    fn test_credit_card_and_loan_without_balance_use_net_processed_flow() {
        for category in ["CREDIT_CARD", "LOAN_ACCOUNT"] {
            let account = json!({"category": category, "balance": {"current": null}});
            let summary = KpiService::summarize(vec![
                tx("INFLOW", "PROCESSED", 75.0, &account),
                tx("OUTFLOW", "PROCESSED", 25.0, &account),
                tx("OUTFLOW", "PENDING", 10.0, &account),
            ]);

            assert_eq!(summary.inflow_total, 75.0, "{category}");
            assert_eq!(summary.outflow_total, 25.0, "{category}");
            assert_eq!(summary.outflow_pending, 10.0, "{category}");
            assert_eq!(summary.balance, 50.0, "{category}");
            assert_eq!(summary.net_contributions, 0.0, "{category}");
        }
    }

    #[test]
    fn test_credit_card_and_loan_prefer_snapshot_balance() {
        for category in ["CREDIT_CARD", "LOAN_ACCOUNT"] {
            let account = json!({"category": category, "balance": {"current": -320.5}});
            let summary = KpiService::summarize(vec![tx("INFLOW", "PROCESSED", 75.0, &account)]);

            assert_eq!(summary.balance, -320.5, "{category}");
        }
    }

    #[test]
    fn test_account_without_transactions() {
        let card = AccountSnapshot::from_value(&json!({
            "category": "CREDIT_CARD", "currency": "MXN", "balance": {"current": 500}
        }));
        let summary = KpiService::summarize_account(&card);
        assert_eq!(summary.balance, 500.0);
        assert_eq!(summary.inflow_total + summary.outflow_total, 0.0);
        assert!(summary.transactions.is_empty());

        let pension = AccountSnapshot::from_value(&json!({
            "category": "PENSION_FUND_ACCOUNT", "funds_data": [{"balance": 10}, {"balance": "5.5"}]
        }));
        assert_eq!(KpiService::summarize_account(&pension).balance, 15.5);

        let broken = AccountSnapshot::from_value(&json!({"balance": "n/a"}));
        assert_eq!(KpiService::summarize_account(&broken).balance, 0.0);
    }

    #[tokio::test]
    async fn test_compute_falls_back_to_account() {
        let mock = Arc::new(MockAggregator::new().with_account(
            "acc-1",
            json!({"id": "acc-1", "category": "CREDIT_CARD", "currency": "MXN",
                   "balance": {"current": 500}}),
        ));
        let state = test_state(mock.clone());

        let summary = KpiService::compute_kpis(&state, "acc-1", "link-1").await.unwrap();

        assert_eq!(summary.balance, 500.0);
        assert_eq!(summary.inflow_total, 0.0);
        assert_eq!(summary.inflow_pending, 0.0);
        assert_eq!(summary.outflow_total, 0.0);
        assert_eq!(summary.outflow_pending, 0.0);
        assert!(summary.transactions.is_empty());
        assert_eq!(mock.call_count("list_transactions"), 1);
        assert_eq!(mock.call_count("get_account"), 1);
    }

    #[tokio::test]
    async fn test_compute_with_transactions_skips_account_call() {
        let account = json!({"category": "CHECKING_ACCOUNT", "balance": {"current": 10}});
        let mock = Arc::new(MockAggregator::new().with_transactions(
            "acc-1",
            "link-1",
            json!({"count": 1, "results": [tx("INFLOW", "PROCESSED", 10.0, &account)]}),
        ));
        let state = test_state(mock.clone());

        let summary = KpiService::compute_kpis(&state, "acc-1", "link-1").await.unwrap();

        assert_eq!(summary.inflow_total, 10.0);
        assert_eq!(summary.transactions.len(), 1);
        assert_eq!(mock.call_count("get_account"), 0);
    }

    #[tokio::test]
    async fn test_compute_propagates_upstream_error() {
        let mock = Arc::new(MockAggregator::new().with_transactions_error(
            "acc-1",
            "link-1",
            401,
            json!({"code": "authentication_failed"}),
        ));
        let state = test_state(mock);

        let err = KpiService::compute_kpis(&state, "acc-1", "link-1").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 401, .. }));
    }
}
