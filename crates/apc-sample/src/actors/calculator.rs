use apc_framework::{ActorContext, ActorError, Behavior, Payload, Responder, SyncBehavior};
use tracing::debug;

use crate::error::DemoError;
use crate::model::CalcOp;

/// Keeps a running total. Supports synchronous calls, so callers on the
/// same thread can read or update it without a round trip.
#[derive(Debug, Default)]
pub struct Calculator {
    total: i64,
}

impl Calculator {
    pub fn new(total: i64) -> Self {
        Self { total }
    }

    fn apply(&mut self, op: CalcOp) -> Result<i64, DemoError> {
        let total = match op {
            CalcOp::Add(n) => self.total.checked_add(n),
            CalcOp::Sub(n) => self.total.checked_sub(n),
            CalcOp::Mul(n) => self.total.checked_mul(n),
            CalcOp::Div(0) => return Err(DemoError::DivisionByZero),
            CalcOp::Div(n) => self.total.checked_div(n),
            CalcOp::Total => Some(self.total),
        };
        self.total = total.ok_or(DemoError::Overflow)?;
        Ok(self.total)
    }
}

impl Behavior for Calculator {
    fn process_request(&mut self, ctx: &ActorContext, request: Payload, responder: Responder) -> Result<(), ActorError> {
        let op = request.take::<CalcOp>()?;
        let total = self.apply(op).map_err(ActorError::failed)?;
        debug!(actor = ctx.name(), ?op, total, "Applied");
        responder.ok(total);
        Ok(())
    }
}

impl SyncBehavior for Calculator {
    fn process_call(&mut self, _ctx: &ActorContext, request: Payload) -> Result<Payload, ActorError> {
        let op = request.take::<CalcOp>()?;
        self.apply(op).map(Payload::new).map_err(ActorError::failed)
    }
}
