use apc_framework::{Caller, JaActor};
use async_trait::async_trait;
use tracing::instrument;

use crate::actors::Pinger;
use crate::clients::ActorClient;
use crate::error::DemoError;
use crate::model::{Ping, PongReply};

#[derive(Clone)]
pub struct PingClient {
    caller: Caller,
    actor: JaActor<Pinger>,
}

impl PingClient {
    pub fn new(caller: Caller, actor: JaActor<Pinger>) -> Self {
        Self { caller, actor }
    }

    #[instrument(skip(self))]
    pub async fn ping(&self, seq: u32) -> Result<PongReply, DemoError> {
        self.request(Ping { seq }).await
    }
}

#[async_trait]
impl ActorClient for PingClient {
    type Target = JaActor<Pinger>;
    type Error = DemoError;

    fn caller(&self) -> &Caller {
        &self.caller
    }

    fn target(&self) -> &Self::Target {
        &self.actor
    }
}
