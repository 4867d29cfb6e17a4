use apc_framework::{Caller, JaActor};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::actors::{Batcher, Calculator};
use crate::clients::ActorClient;
use crate::error::DemoError;
use crate::model::{Batch, CalcOp};

/// Client for the calculator and the batcher in front of it.
#[derive(Clone)]
pub struct CalculatorClient {
    caller: Caller,
    calculator: JaActor<Calculator>,
    batcher: JaActor<Batcher>,
}

impl CalculatorClient {
    pub fn new(caller: Caller, calculator: JaActor<Calculator>, batcher: JaActor<Batcher>) -> Self {
        Self {
            caller,
            calculator,
            batcher,
        }
    }

    /// Applies `op` asynchronously and returns the new total.
    #[instrument(skip(self))]
    pub async fn apply(&self, op: CalcOp) -> Result<i64, DemoError> {
        self.request(op).await
    }

    /// Applies `op` on the current thread through a synchronous call.
    #[instrument(skip(self))]
    pub fn apply_now(&self, op: CalcOp) -> Result<i64, DemoError> {
        debug!("Calling");
        Ok(self.caller.call_as::<i64, _, _>(&self.calculator, op)?)
    }

    /// Applies every op of the batch, returning the total after each one.
    #[instrument(skip(self))]
    pub async fn run_batch(&self, ops: Vec<CalcOp>) -> Result<Vec<i64>, DemoError> {
        Ok(self
            .caller
            .ask_as::<Vec<i64>, _, _>(&self.batcher, Batch(ops))
            .await?)
    }
}

#[async_trait]
impl ActorClient for CalculatorClient {
    type Target = JaActor<Calculator>;
    type Error = DemoError;

    fn caller(&self) -> &Caller {
        &self.caller
    }

    fn target(&self) -> &Self::Target {
        &self.calculator
    }
}
