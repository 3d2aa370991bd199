use crate::models::OrderStatus;

/// The inventory side effect a status transition carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryAction {
    /// Apply the fulfillment decrement (floors at zero).
    Reduce,
    /// Return the quantities to the ledger.
    Restore,
    None,
}

/// Statuses whose entry consumes stock.
fn reduces_inventory(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
    )
}

/// DELIVERED and CANCELLED are terminal: no outgoing transitions.
pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Delivered | OrderStatus::Cancelled)
}

/// Whether `prev -> next` is an allowed transition. Admins may move orders
/// freely among the non-terminal states (including backward); nothing
/// leaves a terminal state.
pub fn transition_permitted(prev: OrderStatus, _next: OrderStatus) -> bool {
    !is_terminal(prev)
}

/// The single authoritative mapping from a status transition to its ledger
/// effect.
///
/// The fulfillment decrement fires exactly once across a run of reducing
/// states: once an order has entered PROCESSING/SHIPPED/DELIVERED, moving
/// between them is inventory-neutral. Cancellation restores the fulfillment
/// decrement when leaving a reducing state, and releases the initial
/// reservation when leaving PENDING.
pub fn next_inventory_action(prev: OrderStatus, next: OrderStatus) -> InventoryAction {
    if reduces_inventory(next) && !reduces_inventory(prev) && prev != OrderStatus::Cancelled {
        return InventoryAction::Reduce;
    }

    if next == OrderStatus::Cancelled
        && (reduces_inventory(prev) || prev == OrderStatus::Pending)
    {
        return InventoryAction::Restore;
    }

    InventoryAction::None
}
