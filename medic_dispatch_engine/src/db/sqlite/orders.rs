use chrono::Utc;
use log::{debug, trace};
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db::{errors::StoreError, sqlite::medics, traits::TransitionRequest},
    db_types::{NewOrder, Order, OrderId, OrderLocation, OrderStatusType, OrderWithLocation},
    order_objects::{OrderQueryFilter, Pagination},
};

const SELECT_ORDERS: &str = r#"
    SELECT
        o.id,
        o.client_id,
        o.medic_id,
        o.service_id,
        o.service_title,
        o.price,
        o.discount,
        o.platform_fee,
        o.status,
        o.client_rating,
        o.created_at,
        o.updated_at,
        l.latitude,
        l.longitude,
        l.address_details,
        l.contact_phone
    FROM orders o LEFT JOIN order_locations l ON l.order_id = o.id
"#;

/// An order joined with its (optional) location row.
#[derive(Debug, FromRow)]
struct OrderRow {
    #[sqlx(flatten)]
    order: Order,
    latitude: Option<f64>,
    longitude: Option<f64>,
    address_details: Option<String>,
    contact_phone: Option<String>,
}

impl From<OrderRow> for OrderWithLocation {
    fn from(row: OrderRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(OrderLocation {
                latitude,
                longitude,
                address_details: row.address_details.unwrap_or_default(),
                contact_phone: row.contact_phone.unwrap_or_default(),
            }),
            _ => None,
        };
        OrderWithLocation { order: row.order, location }
    }
}

/// Inserts the order and its location. This is not atomic on its own; pass `&mut *tx` to run it inside a
/// transaction.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO orders (
                id,
                client_id,
                service_id,
                service_title,
                price,
                discount,
                platform_fee,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10);
        "#,
    )
    .bind(&order.id)
    .bind(order.client_id)
    .bind(order.service.id)
    .bind(&order.service.title)
    .bind(order.service.price)
    .bind(order.discount)
    .bind(order.platform_fee)
    .bind(OrderStatusType::Created)
    .bind(order.created_at)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
            INSERT INTO order_locations (order_id, latitude, longitude, address_details, contact_phone)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(&order.id)
    .bind(order.location.latitude)
    .bind(order.location.longitude)
    .bind(&order.location.address_details)
    .bind(&order.location.contact_phone)
    .execute(conn)
    .await?;
    trace!("🗃️ Order {} inserted", order.id);
    Ok(())
}

pub async fn fetch_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderWithLocation>, StoreError> {
    let mut builder = QueryBuilder::new(SELECT_ORDERS);
    builder.push(" WHERE o.id = ");
    builder.push_bind(order_id);
    let row = builder.build_query_as::<OrderRow>().fetch_optional(conn).await?;
    Ok(row.map(OrderWithLocation::from))
}

/// The compare-and-set primitive behind every status change.
///
/// The `UPDATE` only matches while the order is still in `request.expected`, so two callers racing for the same
/// transition cannot both succeed. A balance credit, if requested, is applied on the same connection, so callers
/// must run this inside a transaction.
pub async fn conditional_transition(
    request: TransitionRequest,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let TransitionRequest { order_id, expected, new_status, fields } = request;
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = $1,
                medic_id = COALESCE($2, medic_id),
                updated_at = $3
            WHERE id = $4 AND status = $5
        "#,
    )
    .bind(new_status)
    .bind(fields.medic_id)
    .bind(Utc::now())
    .bind(&order_id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        let current = fetch_order(&order_id, conn).await?;
        return match current {
            None => Err(StoreError::OrderNotFound(order_id)),
            Some(o) => {
                debug!("🗃️ Order {order_id} was expected to be {expected}, but is {}", o.order.status);
                Err(StoreError::Conflict { order_id, expected, actual: o.order.status })
            },
        };
    }
    if let Some((medic_id, amount)) = fields.credit {
        medics::credit_balance(medic_id, amount, conn).await?;
    }
    let order = fetch_order(&order_id, conn).await?.ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
    debug!("🗃️ Order {order_id} moved from {expected} to {new_status}");
    Ok(order.order)
}

/// Writes the rating on a completed order, provided it has none yet.
pub async fn set_client_rating(
    order_id: &OrderId,
    stars: u8,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET client_rating = $1, updated_at = $2
            WHERE id = $3 AND status = 'DONE' AND client_rating IS NULL AND medic_id IS NOT NULL
        "#,
    )
    .bind(i64::from(stars))
    .bind(Utc::now())
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    let order =
        fetch_order(order_id, conn).await?.ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?.order;
    if result.rows_affected() == 0 {
        if order.client_rating.is_some() {
            return Err(StoreError::AlreadyRated(order_id.clone()));
        }
        let actual = order.status;
        return Err(StoreError::Conflict { order_id: order_id.clone(), expected: OrderStatusType::Done, actual });
    }
    Ok(order)
}

/// Fetches orders according to the criteria in `filter`, oldest first.
pub async fn search_orders(
    filter: OrderQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderWithLocation>, StoreError> {
    let mut builder = QueryBuilder::new(SELECT_ORDERS);
    if !filter.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = filter.order_id {
        where_clause.push("o.id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(client_id) = filter.client_id {
        where_clause.push("o.client_id = ");
        where_clause.push_bind_unseparated(client_id);
    }
    if let Some(medic_id) = filter.medic_id {
        where_clause.push("o.medic_id = ");
        where_clause.push_bind_unseparated(medic_id);
    }
    if let Some(since) = filter.since {
        where_clause.push("o.created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("o.created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(statuses) = filter.status.filter(|s| !s.is_empty()) {
        where_clause.push("o.status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY o.created_at ASC, o.rowid ASC LIMIT ");
    builder.push_bind(pagination.count);
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset);
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<OrderRow>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", rows.len());
    Ok(rows.into_iter().map(OrderWithLocation::from).collect())
}
