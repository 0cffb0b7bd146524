//! Return orders driven through the engine: the registry validates and prices them,
//! confirmation routes the goods back in through the returns process.

use tracing::debug;

use wms_core::{DomainError, DomainResult};
use wms_events::integration::OriginModel;
use wms_returns::{OriginOrder, ReturnOrderId, ReturnRequestLine};

use crate::events::{EngineEvent, RETURN_STREAM};
use crate::state::Ctx;

impl Ctx<'_> {
    pub(crate) fn create_return(
        &mut self,
        id: ReturnOrderId,
        origin: &OriginOrder,
        lines: &[ReturnRequestLine],
    ) -> DomainResult<()> {
        self.state.returns.create(id, origin, lines, self.now)?;
        self.return_changed(id)
    }

    pub(crate) fn confirm_return(&mut self, id: ReturnOrderId) -> DomainResult<()> {
        let inbound = self.state.returns.confirm(id, self.now)?;
        self.return_changed(id)?;
        self.order_confirmed(&inbound)
    }

    pub(crate) fn complete_return(&mut self, id: ReturnOrderId) -> DomainResult<()> {
        self.state.returns.mark_done(id)?;
        self.return_changed(id)
    }

    pub(crate) fn cancel_return(&mut self, id: ReturnOrderId) -> DomainResult<()> {
        self.state.returns.cancel(id)?;
        self.return_changed(id)?;
        self.cancel_origin(OriginModel::ReturnOrder, id.0)
    }

    pub(crate) fn return_changed(&mut self, id: ReturnOrderId) -> DomainResult<()> {
        let order = self
            .state
            .returns
            .get(id)
            .ok_or_else(|| DomainError::not_found(format!("return order {id}")))?;
        let event = EngineEvent::ReturnOrderChanged {
            return_order_id: id,
            code: order.code().to_string(),
            status: order.status(),
            refund_total: order.total_refund(),
            occurred_at: self.now,
        };
        debug!(return_order = %order.code(), status = ?order.status(), "return order changed");
        self.emit(RETURN_STREAM, id.0, event);
        Ok(())
    }
}
