use actix_web::{http::StatusCode, web};
use medic_dispatch_engine::{
    db_types::{OrderStatusType, Role},
    order_objects::Pagination,
    OrderQueryApi,
    StoreError,
};

use super::{
    helpers::{get, json, send, token_for},
    mocks::MockStore,
};
use crate::routes::{AdminOrdersRoute, MedicOrdersRoute, MyOrdersRoute};

#[actix_web::test]
async fn clients_only_see_their_own_orders() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_search_orders()
        .withf(|filter, page| {
            filter.client_id == Some(42) &&
                filter.medic_id.is_none() &&
                *page == Pagination { offset: 10, count: 5 }
        })
        .times(1)
        .returning(|_, _| Ok(vec![]));
    let token = token_for(Role::Client, 42);
    let (status, body) = send(get("/orders?offset=10&count=5", &token), move |cfg| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(store))).service(MyOrdersRoute::<MockStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "offset": 10, "count": 0, "orders": [] }));
}

#[actix_web::test]
async fn medics_see_the_orders_bound_to_them() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_search_orders()
        .withf(|filter, _| filter.medic_id == Some(7) && filter.client_id.is_none())
        .times(1)
        .returning(|_, _| Ok(vec![]));
    let token = token_for(Role::Medic, 7);
    let (status, _) = send(get("/medic/orders", &token), move |cfg| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(store))).service(MedicOrdersRoute::<MockStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn admin_search_takes_a_status_list() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_search_orders()
        .withf(|filter, _| {
            filter.status == Some(vec![OrderStatusType::Created, OrderStatusType::Assigned]) &&
                filter.client_id == Some(42)
        })
        .times(1)
        .returning(|_, _| Ok(vec![]));
    let token = token_for(Role::Admin, 1);
    let (status, _) = send(get("/admin/orders?status=CREATED,ASSIGNED&client_id=42", &token), move |cfg| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(store))).service(AdminOrdersRoute::<MockStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn admin_search_rejects_unknown_statuses() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_search_orders().never();
    let token = token_for(Role::Admin, 1);
    let (status, body) = send(get("/admin/orders?status=CREATED,MISPLACED", &token), move |cfg| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(store))).service(AdminOrdersRoute::<MockStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"), "{body}");
}

#[actix_web::test]
async fn clients_cannot_search_every_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_search_orders().never();
    let token = token_for(Role::Client, 42);
    let (status, _) = send(get("/admin/orders", &token), move |cfg| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(store))).service(AdminOrdersRoute::<MockStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn storage_failures_are_server_errors() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_search_orders().times(1).returning(|_, _| Err(StoreError::QueryError("disk full".into())));
    let token = token_for(Role::Client, 42);
    let (status, body) = send(get("/orders", &token), move |cfg| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(store))).service(MyOrdersRoute::<MockStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json(&body)["error"].as_str().unwrap().contains("disk full"), "{body}");
}
