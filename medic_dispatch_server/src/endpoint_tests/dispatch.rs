use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use medic_dispatch_engine::{
    db_types::{GeoPoint, Role},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_medic, seed_service, MedicSeed},
    },
    DispatchApi,
    NotificationApi,
    OrderQueryApi,
    SqliteDatabase,
};
use serde_json::{json as j, Value};

use super::helpers::{get, json, post, send, token_for, with_token};
use crate::routes::{
    AcceptOrderRoute,
    AdminCancelOrderRoute,
    AdvanceStatusRoute,
    ApproveMedicRoute,
    AvailableOrdersRoute,
    BlockMedicRoute,
    CancelOrderRoute,
    NearbyMedicsRoute,
    PlaceOrderRoute,
    ProviderLocationRoute,
    RateOrderRoute,
    ReportLocationRoute,
    SetOnlineRoute,
    SubscribeRoute,
    UnsubscribeRoute,
};

const CLIENT: i64 = 42;
const MEDIC: i64 = 1;

async fn seeded_db() -> SqliteDatabase {
    let db = prepare_test_env(&random_db_path()).await;
    seed_service(&db, 3, "IV drip", 100_000, true).await;
    seed_service(&db, 4, "Retired service", 50_000, false).await;
    seed_medic(&db, MedicSeed::approved(MEDIC).at(GeoPoint::new(41.3111, 69.2797))).await;
    seed_medic(&db, MedicSeed::pending(2)).await;
    db
}

fn routes(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(DispatchApi::new(db.clone(), EventProducers::default())))
            .app_data(web::Data::new(OrderQueryApi::new(db.clone())))
            .app_data(web::Data::new(NotificationApi::new(db)))
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(RateOrderRoute::<SqliteDatabase>::new())
            .service(ProviderLocationRoute::<SqliteDatabase>::new())
            .service(AvailableOrdersRoute::<SqliteDatabase>::new())
            .service(AcceptOrderRoute::<SqliteDatabase>::new())
            .service(AdvanceStatusRoute::<SqliteDatabase>::new())
            .service(ReportLocationRoute::<SqliteDatabase>::new())
            .service(SetOnlineRoute::<SqliteDatabase>::new())
            .service(AdminCancelOrderRoute::<SqliteDatabase>::new())
            .service(NearbyMedicsRoute::<SqliteDatabase>::new())
            .service(ApproveMedicRoute::<SqliteDatabase>::new())
            .service(BlockMedicRoute::<SqliteDatabase>::new())
            .service(SubscribeRoute::<SqliteDatabase>::new())
            .service(UnsubscribeRoute::<SqliteDatabase>::new());
    }
}

fn order_request(service_id: i64, discount: i64) -> Value {
    j!({
        "service_id": service_id,
        "discount": discount,
        "location": {
            "latitude": 41.2995,
            "longitude": 69.2401,
            "address_details": "Mirabad 9, apt 3",
            "contact_phone": "+998 90 765 43 21"
        }
    })
}

async fn call(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, String) {
    send(req, routes(db.clone())).await
}

async fn place_order(db: &SqliteDatabase) -> String {
    let (status, body) = call(db, post("/orders", &token_for(Role::Client, CLIENT), order_request(3, 10_000))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    json(&body)["id"].as_str().expect("Order has no id").to_string()
}

async fn medic_post(db: &SqliteDatabase, path: &str, body: Value) -> (StatusCode, Value) {
    let (status, body) = call(db, post(path, &token_for(Role::Medic, MEDIC), body)).await;
    (status, json(&body))
}

#[actix_web::test]
async fn an_order_from_placement_to_rating() {
    let db = seeded_db().await;
    let client = token_for(Role::Client, CLIENT);
    let (status, body) = call(&db, post("/orders", &client, order_request(3, 10_000))).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = json(&body);
    assert_eq!(order["status"], "CREATED");
    assert_eq!(order["price"], 100_000);
    assert_eq!(order["platform_fee"], 9_000);
    assert_eq!(order["service_title"], "IV drip");
    assert_eq!(order["location"]["address_details"], "Mirabad 9, apt 3");
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, body) = call(&db, get("/medic/orders/available", &token_for(Role::Medic, MEDIC))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)[0]["id"], order_id.as_str());

    let (status, order) = medic_post(&db, &format!("/medic/orders/{order_id}/accept"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "ASSIGNED");
    assert_eq!(order["medic_id"], MEDIC);

    let path = format!("/medic/orders/{order_id}/status");
    for next in ["ACCEPTED", "ON_THE_WAY", "ARRIVED", "SERVICE_STARTED", "DONE"] {
        let (status, order) = medic_post(&db, &path, j!({ "status": next })).await;
        assert_eq!(status, StatusCode::OK, "{order}");
        assert_eq!(order["status"], next);
    }

    let (status, body) = call(&db, post(&format!("/orders/{order_id}/rate"), &client, j!({ "stars": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["client_rating"], 5);

    let (status, body) = call(&db, post(&format!("/orders/{order_id}/rate"), &client, j!({ "stars": 4 }))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[actix_web::test]
async fn engine_errors_map_to_status_codes() {
    let db = seeded_db().await;
    let client = token_for(Role::Client, CLIENT);

    // Unknown and inactive catalog entries
    let (status, _) = call(&db, post("/orders", &client, order_request(99, 0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&db, post("/orders", &client, order_request(4, 0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // A discount larger than the price
    let (status, _) = call(&db, post("/orders", &client, order_request(3, 200_000))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let order_id = place_order(&db).await;
    // Skipping ahead is not a valid transition
    let (status, _) = medic_post(&db, &format!("/medic/orders/{order_id}/accept"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = medic_post(&db, &format!("/medic/orders/{order_id}/status"), j!({ "status": "DONE" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    // The order is taken
    let token = token_for(Role::Medic, 3);
    seed_medic(&db, MedicSeed::approved(3)).await;
    let (status, _) = call(&db, post(&format!("/medic/orders/{order_id}/accept"), &token, Value::Null)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    // Someone else's order
    let other = token_for(Role::Client, 43);
    let (status, _) = call(&db, post(&format!("/orders/{order_id}/cancel"), &other, Value::Null)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // Rating before the service is done
    let (status, _) = call(&db, post(&format!("/orders/{order_id}/rate"), &client, j!({ "stars": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // No such order
    let (status, _) = call(&db, post("/orders/nope/cancel", &client, Value::Null)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // Pending medics cannot take orders
    let pending = token_for(Role::Medic, 2);
    let (status, _) = call(&db, get("/medic/orders/available", &pending)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn clients_follow_the_medic() {
    let db = seeded_db().await;
    let client = token_for(Role::Client, CLIENT);
    let order_id = place_order(&db).await;
    let location_path = format!("/orders/{order_id}/provider-location");

    let (status, body) = call(&db, get(&location_path, &client)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), Value::Null);

    medic_post(&db, &format!("/medic/orders/{order_id}/accept"), Value::Null).await;
    let (status, body) =
        medic_post(&db, &format!("/medic/orders/{order_id}/location"), j!({ "latitude": 41.3, "longitude": 69.25 }))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call(&db, get(&location_path, &client)).await;
    assert_eq!(status, StatusCode::OK);
    let position = json(&body);
    assert_eq!(position["medic_id"], MEDIC);
    assert_eq!(position["latitude"], 41.3);
    assert_eq!(position["longitude"], 69.25);

    let other = token_for(Role::Client, 43);
    let (status, _) = call(&db, get(&location_path, &other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn clients_cancel_before_the_medic_leaves() {
    let db = seeded_db().await;
    let client = token_for(Role::Client, CLIENT);
    let order_id = place_order(&db).await;
    let (status, body) = call(&db, post(&format!("/orders/{order_id}/cancel"), &client, Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "CANCELED");
    let (status, _) = call(&db, post(&format!("/orders/{order_id}/cancel"), &client, Value::Null)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let order_id = place_order(&db).await;
    medic_post(&db, &format!("/medic/orders/{order_id}/accept"), Value::Null).await;
    for next in ["ACCEPTED", "ON_THE_WAY"] {
        medic_post(&db, &format!("/medic/orders/{order_id}/status"), j!({ "status": next })).await;
    }
    let (status, _) = call(&db, post(&format!("/orders/{order_id}/cancel"), &client, Value::Null)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    // Operators can still step in
    let admin = token_for(Role::Admin, 1);
    let (status, body) = call(&db, post(&format!("/admin/orders/{order_id}/cancel"), &admin, Value::Null)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "CANCELED");
}

#[actix_web::test]
async fn operators_manage_medics() {
    let db = seeded_db().await;
    let admin = token_for(Role::Admin, 1);
    let order_id = place_order(&db).await;

    let (status, body) = call(&db, get(&format!("/admin/orders/{order_id}/nearby-medics"), &admin)).await;
    assert_eq!(status, StatusCode::OK);
    let nearby = json(&body);
    assert_eq!(nearby.as_array().map(Vec::len), Some(1));
    assert_eq!(nearby[0]["id"], MEDIC);

    let (status, body) = call(&db, post("/admin/medics/2/approve", &admin, Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["verification_status"], "APPROVED");
    let pending = token_for(Role::Medic, 2);
    let (status, _) = call(&db, get("/medic/orders/available", &pending)).await;
    assert_eq!(status, StatusCode::OK);

    let req = with_token(TestRequest::post().uri("/admin/medics/2/block"), &admin);
    let (status, body) = call(&db, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["is_blocked"], true);
    let (status, _) = call(&db, get("/medic/orders/available", &pending)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&db, post("/admin/medics/2/block", &admin, j!({ "blocked": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["is_blocked"], false);

    let (status, _) = call(&db, post("/admin/medics/404/approve", &admin, Value::Null)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn medics_go_online_and_offline() {
    let db = seeded_db().await;
    let (status, body) = medic_post(&db, "/medic/online", j!({ "online": false })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_online"], false);
    let (status, body) =
        medic_post(&db, "/medic/online", j!({ "online": true, "location": { "latitude": 41.0, "longitude": 69.0 } }))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_online"], true);
    assert_eq!(body["latitude"], 41.0);
}

#[actix_web::test]
async fn notification_subscriptions() {
    let db = seeded_db().await;
    let client = token_for(Role::Client, CLIENT);
    let body = j!({ "channel": "telegram", "endpoint": "123456789" });
    let (status, body) = call(&db, post("/subscriptions", &client, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = json(&body)["id"].as_i64().unwrap();

    let body = j!({ "channel": "web_push", "endpoint": "http://insecure.example.com" });
    let (status, _) = call(&db, post("/subscriptions", &client, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let admin = token_for(Role::Admin, 1);
    let body = j!({ "channel": "telegram", "endpoint": "1" });
    let (status, _) = call(&db, post("/subscriptions", &admin, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let medic = token_for(Role::Medic, MEDIC);
    let delete = |token: &str| with_token(TestRequest::delete().uri(&format!("/subscriptions/{id}")), token);
    let (status, _) = call(&db, delete(&medic)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&db, delete(&client)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&db, delete(&client)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
