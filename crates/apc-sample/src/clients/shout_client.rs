use apc_framework::{Caller, ExceptionHandler, JaActor, TargetActor};
use async_trait::async_trait;
use tracing::instrument;

use crate::actors::Shouter;
use crate::clients::ActorClient;
use crate::error::DemoError;
use crate::model::Shout;

#[derive(Clone)]
pub struct ShoutClient {
    caller: Caller,
    actor: JaActor<Shouter>,
}

impl ShoutClient {
    pub fn new(caller: Caller, actor: JaActor<Shouter>) -> Self {
        Self { caller, actor }
    }

    #[instrument(skip(self))]
    pub async fn shout(&self, text: &str) -> Result<String, DemoError> {
        self.request(Shout::from(text)).await
    }

    /// Installs the actor's default handler and returns the previous one.
    pub fn set_fallback(&self, handler: Option<ExceptionHandler>) -> Option<ExceptionHandler> {
        self.actor.set_exception_handler(handler)
    }
}

#[async_trait]
impl ActorClient for ShoutClient {
    type Target = JaActor<Shouter>;
    type Error = DemoError;

    fn caller(&self) -> &Caller {
        &self.caller
    }

    fn target(&self) -> &Self::Target {
        &self.actor
    }
}
