//! Return orders and the proportional refund allocator.
//!
//! A return is validated against its origin (sale or purchase) order and the quantities
//! already returned, then each line gets a refund that carries its share of the origin's
//! discount and tax.

pub mod allocator;
pub mod order;
pub mod origin;
pub mod registry;

pub use allocator::{RefundAllocation, ReturnRequestLine, allocate};
pub use order::{ReturnLine, ReturnOrder, ReturnOrderId, ReturnOrderStatus};
pub use origin::{OriginLine, OriginOrder, OriginOrderStatus, ReturnOrigin};
pub use registry::ReturnRegistry;
