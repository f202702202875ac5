use std::collections::HashMap;

use cucumber::World;
use medic_dispatch_engine::{
    db_types::OrderId,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    DispatchApi,
    DispatchError,
    OrderQueryApi,
    SqliteDatabase,
};

#[derive(Debug)]
pub struct DispatchSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub api: DispatchApi<SqliteDatabase>,
    pub queries: OrderQueryApi<SqliteDatabase>,
}

impl DispatchSystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        let db = prepare_test_env(&db_path).await;
        let api = DispatchApi::new(db.clone(), EventProducers::default());
        let queries = OrderQueryApi::new(db.clone());
        Self { db_path, db, api, queries }
    }
}

#[derive(Default, Debug, World)]
pub struct DispatchWorld {
    pub system: Option<DispatchSystem>,
    /// Orders are referred to by a name in the feature files, since their ids are random.
    pub orders: HashMap<String, OrderId>,
    pub last_error: Option<DispatchError>,
}

impl DispatchWorld {
    pub fn system(&self) -> &DispatchSystem {
        self.system.as_ref().expect("System not initialised. Start the scenario with 'Given a fresh install'")
    }

    pub fn order_id(&self, name: &str) -> OrderId {
        self.orders.get(name).cloned().unwrap_or_else(|| panic!("No order called {name} has been placed"))
    }

    pub fn record<T>(&mut self, result: Result<T, DispatchError>) {
        self.last_error = result.err();
    }
}
