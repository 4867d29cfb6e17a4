use std::sync::Arc;

use apc_framework::{ActorContext, ActorError, Behavior, JaActor, Payload, Responder, ResponseProcessor};
use parking_lot::Mutex;
use tracing::debug;

use crate::actors::Calculator;
use crate::error::DemoError;
use crate::model::Batch;

/// Progress of one batch. Only touched by continuations, which all run on
/// the batcher's worker.
struct Collected {
    totals: Vec<i64>,
    expected: usize,
    responder: Option<Responder>,
}

/// Sends every operation of a [`Batch`] to the calculator at once and
/// answers with the running totals, in the order the operations were sent.
pub struct Batcher {
    calculator: JaActor<Calculator>,
}

impl Batcher {
    pub fn new(calculator: JaActor<Calculator>) -> Self {
        Self { calculator }
    }
}

impl Behavior for Batcher {
    fn process_request(&mut self, ctx: &ActorContext, request: Payload, responder: Responder) -> Result<(), ActorError> {
        let Batch(ops) = request.take::<Batch>()?;
        if ops.is_empty() {
            return Err(ActorError::failed(DemoError::EmptyBatch));
        }
        debug!(actor = ctx.name(), ops = ops.len(), "Batch started");

        let collected = Arc::new(Mutex::new(Collected {
            totals: Vec::with_capacity(ops.len()),
            expected: ops.len(),
            responder: Some(responder),
        }));

        for op in ops {
            let collected = Arc::clone(&collected);
            ctx.send(
                &self.calculator,
                op,
                ResponseProcessor::typed::<i64, _>(move |result| {
                    let mut state = collected.lock();
                    match result {
                        Ok(total) => {
                            state.totals.push(total);
                            if state.totals.len() == state.expected {
                                let totals = std::mem::take(&mut state.totals);
                                if let Some(responder) = state.responder.take() {
                                    responder.ok(totals);
                                }
                            }
                        }
                        // First failure answers the batch; later replies find no responder.
                        Err(e) => {
                            if let Some(responder) = state.responder.take() {
                                responder.err(e);
                            }
                        }
                    }
                }),
            )?;
        }
        Ok(())
    }
}
