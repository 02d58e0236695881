#![allow(dead_code)]
//! Shared fixtures for the engine integration tests.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use ccg_engine::{
    db_types::Product,
    test_utils::{
        self,
        prepare_env::{prepare_test_env, random_db_path},
    },
    traits::{ChargeHandle, ChargeRequest, ChargeSummary, GatewayError, PaymentGateway, RemoteCharge, RemoteStatus},
    SqliteDatabase,
};
pub use ccg_engine::test_utils::{prepare_env::tear_down, reprice_product};

/// A fresh, migrated database in the temp directory.
pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection pool")
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price: &str) -> Product {
    test_utils::seed_product(db, name, price, true).await
}

pub async fn seed_inactive_product(db: &SqliteDatabase, name: &str, price: &str) -> Product {
    test_utils::seed_product(db, name, price, false).await
}

pub async fn count_rows(db: &SqliteDatabase, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(db.pool()).await.unwrap()
}

/// An in-process payment gateway that hands out sequential charge ids and reports whatever status the test sets.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub unconfigured: bool,
    pub fail_with: Option<GatewayError>,
    pub delay: Option<Duration>,
    pub charges_created: Arc<AtomicU64>,
    pub statuses: Arc<Mutex<HashMap<String, RemoteStatus>>>,
    pub requests: Arc<Mutex<Vec<ChargeRequest>>>,
}

impl FakeGateway {
    pub fn failing(error: GatewayError) -> Self {
        Self { fail_with: Some(error), ..Default::default() }
    }

    pub fn unconfigured() -> Self {
        Self { unconfigured: true, ..Default::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Default::default() }
    }

    pub fn set_status(&self, charge_id: &str, status: RemoteStatus) {
        self.statuses.lock().unwrap().insert(charge_id.to_string(), status);
    }

    pub fn created(&self) -> u64 {
        self.charges_created.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for FakeGateway {
    fn is_configured(&self) -> bool {
        !self.unconfigured
    }

    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeHandle, GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        let n = self.charges_created.fetch_add(1, Ordering::SeqCst) + 1;
        let charge_id = format!("charge-{n}");
        self.requests.lock().unwrap().push(request);
        self.set_status(&charge_id, RemoteStatus::New);
        let mut addresses = std::collections::BTreeMap::new();
        addresses.insert("bitcoin".to_string(), format!("bc1qfake{n}"));
        Ok(ChargeHandle {
            charge_id: charge_id.clone(),
            hosted_url: format!("https://pay.example.com/{charge_id}"),
            code: format!("CODE{n}"),
            expires_at: None,
            addresses,
        })
    }

    async fn query_charge(&self, charge_id: &str) -> Result<RemoteCharge, GatewayError> {
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(charge_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected(format!("No such charge: {charge_id}")))?;
        Ok(RemoteCharge {
            charge_id: charge_id.to_string(),
            status,
            confirmed_at: None,
            expires_at: None,
            payments: vec![],
        })
    }

    async fn list_charges(&self) -> Result<Vec<ChargeSummary>, GatewayError> {
        let statuses = self.statuses.lock().unwrap();
        let mut ids = statuses.keys().cloned().collect::<Vec<_>>();
        ids.sort();
        Ok(ids
            .into_iter()
            .map(|id| ChargeSummary { raw: serde_json::json!({ "id": id, "status": statuses[&id].to_string() }), charge_id: id })
            .collect())
    }
}
