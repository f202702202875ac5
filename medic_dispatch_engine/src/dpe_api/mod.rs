pub mod dispatch_api;
pub mod errors;
pub mod notification_api;
pub mod order_objects;
pub mod order_query_api;
