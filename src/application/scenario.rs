use crate::application::engine::CorrelationEngine;
use crate::domain::pending::{EntitlementsReceiver, ProductsReceiver};
use crate::domain::product::{Product, ProductId};
use crate::error::{BillingError, Result};
use crate::infrastructure::simulated::SimulatedStore;
use serde::{Deserialize, Serialize};

/// One step of a scripted billing session.
///
/// Caller-side ops drive the engine's public API; store-side ops make the
/// simulated store emit the matching callback.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ScriptOp {
    FetchProducts,
    Purchase,
    FetchPurchases,
    RespondProducts,
    FailProducts,
    ApprovePurchase,
    RejectPurchase,
    Restore,
    FinishRestore,
    FailRestore,
}

impl ScriptOp {
    /// The op name as written in script files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchProducts => "fetch_products",
            Self::Purchase => "purchase",
            Self::FetchPurchases => "fetch_purchases",
            Self::RespondProducts => "respond_products",
            Self::FailProducts => "fail_products",
            Self::ApprovePurchase => "approve_purchase",
            Self::RejectPurchase => "reject_purchase",
            Self::Restore => "restore",
            Self::FinishRestore => "finish_restore",
            Self::FailRestore => "fail_restore",
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScriptRow {
    pub op: ScriptOp,
    /// Product identifier or `;`-separated identifier list, depending on the
    /// op. Empty for ops that take no argument.
    pub arg: Option<String>,
}

/// Outcome of one script row, or the final ledger line.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OutcomeRow {
    /// 1-based script row number; empty on the ledger line.
    pub row: Option<u32>,
    pub op: String,
    pub status: OutcomeStatus,
    pub detail: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Resolved,
    Failed,
    Pending,
}

impl OutcomeRow {
    fn resolved(row: u32, op: &str, detail: String) -> Self {
        Self {
            row: Some(row),
            op: op.to_string(),
            status: OutcomeStatus::Resolved,
            detail,
        }
    }

    fn failed(row: u32, op: &str, detail: String) -> Self {
        Self {
            row: Some(row),
            op: op.to_string(),
            status: OutcomeStatus::Failed,
            detail,
        }
    }

    fn pending(row: u32, op: &str) -> Self {
        Self {
            row: Some(row),
            op: op.to_string(),
            status: OutcomeStatus::Pending,
            detail: "unresolved".to_string(),
        }
    }

    /// The final line summarizing the entitlement ledger.
    pub fn ledger(entitlements: &[ProductId]) -> Self {
        Self {
            row: None,
            op: "ledger".to_string(),
            status: OutcomeStatus::Resolved,
            detail: join_identifiers(entitlements),
        }
    }
}

/// Everything one scenario produced: per-row outcomes sorted by script row,
/// plus the final entitlement snapshot.
#[derive(Debug)]
pub struct ScenarioReport {
    pub outcomes: Vec<OutcomeRow>,
    pub entitlements: Vec<ProductId>,
}

enum PendingKind {
    Products(ProductsReceiver),
    Entitlements(EntitlementsReceiver),
}

struct PendingCaller {
    row: u32,
    op: &'static str,
    kind: PendingKind,
}

/// Replays a scripted billing session against the engine and a simulated
/// store.
///
/// Caller-side rows register receivers that are polled once the whole script
/// has run; rows whose receiver never resolved are reported as pending.
/// Store-side rows turn recorded submissions into callbacks, so a script can
/// interleave requests and deliveries in any order the real store could.
pub struct ScenarioRunner {
    engine: CorrelationEngine,
    store: SimulatedStore,
}

impl ScenarioRunner {
    /// Creates a runner whose simulated store backend knows `catalog`. The
    /// engine's own product cache stays empty until a scripted fetch
    /// succeeds.
    pub fn new(catalog: Vec<Product>) -> Self {
        let store = SimulatedStore::with_catalog(catalog);
        let engine = CorrelationEngine::new(Box::new(store.clone()));
        Self { engine, store }
    }

    /// Runs every script row and reports one outcome per caller-side row,
    /// in row order.
    pub async fn run<I>(self, rows: I) -> ScenarioReport
    where
        I: IntoIterator<Item = Result<ScriptRow>>,
    {
        let mut outcomes = Vec::new();
        let mut callers = Vec::new();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index as u32 + 1;
            match row {
                Ok(script) => {
                    self.execute(row_number, script, &mut outcomes, &mut callers)
                        .await;
                }
                Err(e) => outcomes.push(OutcomeRow::failed(row_number, "script", e.to_string())),
            }
        }

        for caller in callers {
            outcomes.push(settle(caller));
        }
        outcomes.sort_by_key(|outcome| outcome.row);

        let entitlements = self.engine.entitlements().await;
        ScenarioReport {
            outcomes,
            entitlements,
        }
    }

    async fn execute(
        &self,
        row: u32,
        script: ScriptRow,
        outcomes: &mut Vec<OutcomeRow>,
        callers: &mut Vec<PendingCaller>,
    ) {
        let op = script.op.name();
        match script.op {
            ScriptOp::FetchProducts => match identifier_list(script.arg) {
                Ok(identifiers) => match self.engine.fetch_products(identifiers).await {
                    Ok(receiver) => callers.push(PendingCaller {
                        row,
                        op,
                        kind: PendingKind::Products(receiver),
                    }),
                    Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
                },
                Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
            },
            ScriptOp::Purchase => match single_identifier(script.arg) {
                Ok(identifier) => match self.engine.purchase(identifier).await {
                    Ok(receiver) => callers.push(PendingCaller {
                        row,
                        op,
                        kind: PendingKind::Entitlements(receiver),
                    }),
                    Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
                },
                Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
            },
            ScriptOp::FetchPurchases => match self.engine.fetch_purchases().await {
                Ok(receiver) => callers.push(PendingCaller {
                    row,
                    op,
                    kind: PendingKind::Entitlements(receiver),
                }),
                Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
            },
            ScriptOp::RespondProducts => match self.store.respond_products().await {
                Some((handle, products)) => {
                    self.engine.on_products_response(handle, products).await;
                }
                None => outcomes.push(OutcomeRow::failed(
                    row,
                    op,
                    "no outstanding products request".to_string(),
                )),
            },
            ScriptOp::FailProducts => match self.store.fail_products().await {
                Some(handle) => self.engine.on_products_failure(handle).await,
                None => outcomes.push(OutcomeRow::failed(
                    row,
                    op,
                    "no outstanding products request".to_string(),
                )),
            },
            ScriptOp::ApprovePurchase => match single_identifier(script.arg) {
                Ok(identifier) => match self.store.approve_payment(&identifier).await {
                    Some(event) => self.engine.on_transactions(vec![event]).await,
                    None => outcomes.push(OutcomeRow::failed(
                        row,
                        op,
                        format!("no outstanding payment for {}", identifier),
                    )),
                },
                Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
            },
            ScriptOp::RejectPurchase => match single_identifier(script.arg) {
                Ok(identifier) => match self.store.reject_payment(&identifier).await {
                    Some(event) => self.engine.on_transactions(vec![event]).await,
                    None => outcomes.push(OutcomeRow::failed(
                        row,
                        op,
                        format!("no outstanding payment for {}", identifier),
                    )),
                },
                Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
            },
            ScriptOp::Restore => match identifier_list(script.arg) {
                Ok(identifiers) => match self.store.restore_events(&identifiers).await {
                    Some(events) => self.engine.on_transactions(events).await,
                    None => outcomes.push(OutcomeRow::failed(
                        row,
                        op,
                        "no restore cycle in progress".to_string(),
                    )),
                },
                Err(e) => outcomes.push(OutcomeRow::failed(row, op, e.to_string())),
            },
            ScriptOp::FinishRestore => {
                if self.store.finish_restore().await {
                    self.engine.on_restore_finished().await;
                } else {
                    outcomes.push(OutcomeRow::failed(
                        row,
                        op,
                        "no restore cycle in progress".to_string(),
                    ));
                }
            }
            ScriptOp::FailRestore => {
                if self.store.fail_restore().await {
                    self.engine.on_restore_failed().await;
                } else {
                    outcomes.push(OutcomeRow::failed(
                        row,
                        op,
                        "no restore cycle in progress".to_string(),
                    ));
                }
            }
        }
    }
}

fn settle(caller: PendingCaller) -> OutcomeRow {
    let PendingCaller { row, op, kind } = caller;
    match kind {
        PendingKind::Products(mut receiver) => match receiver.try_recv() {
            Ok(Ok(products)) => OutcomeRow::resolved(row, op, join_products(&products)),
            Ok(Err(e)) => OutcomeRow::failed(row, op, e.to_string()),
            Err(_) => OutcomeRow::pending(row, op),
        },
        PendingKind::Entitlements(mut receiver) => match receiver.try_recv() {
            Ok(Ok(entitlements)) => OutcomeRow::resolved(row, op, join_identifiers(&entitlements)),
            Ok(Err(e)) => OutcomeRow::failed(row, op, e.to_string()),
            Err(_) => OutcomeRow::pending(row, op),
        },
    }
}

fn join_products(products: &[Product]) -> String {
    products
        .iter()
        .map(|product| {
            format!(
                "{}@{} {}",
                product.identifier, product.price, product.currency_code
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn join_identifiers(identifiers: &[ProductId]) -> String {
    identifiers
        .iter()
        .map(|identifier| identifier.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn identifier_list(arg: Option<String>) -> Result<Vec<ProductId>> {
    let raw = arg.unwrap_or_default();
    let identifiers: Vec<ProductId> = raw
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ProductId::from)
        .collect();
    if identifiers.is_empty() {
        return Err(BillingError::ScriptError(
            "expected one or more product identifiers".to_string(),
        ));
    }
    Ok(identifiers)
}

fn single_identifier(arg: Option<String>) -> Result<ProductId> {
    match arg.as_deref().map(str::trim) {
        Some(identifier) if !identifier.is_empty() => Ok(ProductId::from(identifier)),
        _ => Err(BillingError::ScriptError(
            "expected a product identifier".to_string(),
        )),
    }
}
