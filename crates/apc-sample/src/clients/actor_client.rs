//! # ActorClient Trait
//!
//! Common plumbing for the typed clients: a default `request` built on
//! [`Caller::ask_as`] that maps framework errors into the client's error type.

use std::any::Any;

use apc_framework::{Actor, ActorError, Caller};
use async_trait::async_trait;

#[async_trait]
pub trait ActorClient: Send + Sync {
    type Target: Actor;
    type Error: From<ActorError> + Send;

    fn caller(&self) -> &Caller;

    fn target(&self) -> &Self::Target;

    /// Sends `value` and waits for a reply of type `R`.
    #[tracing::instrument(skip_all)]
    async fn request<T, R>(&self, value: T) -> Result<R, Self::Error>
    where
        T: Any + Send,
        R: Any + Send,
    {
        tracing::debug!(request = std::any::type_name::<T>(), "Sending request");
        self.caller()
            .ask_as::<R, _, _>(self.target(), value)
            .await
            .map_err(Into::into)
    }
}
