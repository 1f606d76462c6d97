//! Real-time push events.
//!
//! The backend pushes named events over the real-time channel. Clients do not interpret the
//! payloads; an event only signals that some REST data is stale and should be refetched.

/// Event emitted when an order line changes state.
pub const ORDER_LINE_UPDATED: &str = "orden_actualizada";

/// Event emitted when a new order is created.
pub const ORDER_CREATED: &str = "pedido_creado";

/// Which REST data a push event invalidates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RefetchScope {
    /// Order lines (`ordenes`), e.g. the kitchen queue.
    OrderLines,
    /// Orders (`pedidos`), e.g. the waiter's open tables.
    Orders,
}

impl RefetchScope {
    /// Classify a push event by name. Unknown events invalidate nothing.
    pub fn from_event(event_name: &str) -> Option<Self> {
        match event_name {
            ORDER_LINE_UPDATED => Some(Self::OrderLines),
            ORDER_CREATED => Some(Self::Orders),
            _ => None,
        }
    }

    /// The REST resource that should be refetched.
    pub const fn resource(self) -> &'static str {
        match self {
            Self::OrderLines => "ordenes",
            Self::Orders => "pedidos",
        }
    }
}
