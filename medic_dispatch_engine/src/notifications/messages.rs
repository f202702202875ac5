use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatusType, OrderWithLocation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub order_id: Option<OrderId>,
    pub status: Option<OrderStatusType>,
}

impl Notification {
    pub fn new<S1: Into<String>, S2: Into<String>>(title: S1, body: S2) -> Self {
        Self { title: title.into(), body: body.into(), order_id: None, status: None }
    }

    pub fn for_order(mut self, order_id: OrderId, status: OrderStatusType) -> Self {
        self.order_id = Some(order_id);
        self.status = Some(status);
        self
    }

    /// Title and body on two lines, for channels that only carry plain text.
    pub fn as_text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }
}

/// The message a client receives when their order moves to `order.status`. `CREATED` has no message.
pub fn status_message(order: &Order) -> Option<Notification> {
    let title = &order.service_title;
    let (heading, body) = match order.status {
        OrderStatusType::Created => return None,
        OrderStatusType::Assigned => ("A medic has taken your order", format!("A medic is reviewing your {title} order.")),
        OrderStatusType::Accepted => ("Your order is confirmed", format!("Your medic has confirmed the {title} visit.")),
        OrderStatusType::OnTheWay => ("Your medic is on the way", "You can follow their location in the app.".into()),
        OrderStatusType::Arrived => ("Your medic has arrived", "Your medic is at your address.".into()),
        OrderStatusType::ServiceStarted => ("Service started", format!("Your {title} has started.")),
        OrderStatusType::Done => ("Service complete", format!("Your {title} is complete. Please rate your medic.")),
        OrderStatusType::Canceled => ("Order cancelled", format!("Your {title} order has been cancelled.")),
    };
    Some(Notification::new(heading, body).for_order(order.id.clone(), order.status))
}

/// The message a medic receives when an order they were bound to is cancelled.
pub fn cancellation_for_medic(order: &Order) -> Notification {
    Notification::new("Order cancelled", format!("The {} order {} has been cancelled.", order.service_title, order.id))
        .for_order(order.id.clone(), order.status)
}

/// The alert broadcast to online medics when a new order is placed.
pub fn new_order_message(order: &OrderWithLocation) -> Notification {
    let o = &order.order;
    let body = format!("{} for {}. Earn {}.", o.service_title, o.net_price(), o.medic_earnings());
    Notification::new("New order nearby", body).for_order(o.id.clone(), o.status)
}
