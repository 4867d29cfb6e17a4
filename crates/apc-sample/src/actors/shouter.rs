use apc_framework::{ActorContext, ActorError, Behavior, Payload, Responder};

use crate::error::DemoError;
use crate::model::Shout;

/// Shouts text back in upper case. Rejects the word "bad" and panics on
/// "panic", so it can stand in for any actor that fails.
#[derive(Debug, Default)]
pub struct Shouter;

impl Behavior for Shouter {
    fn process_request(&mut self, _ctx: &ActorContext, request: Payload, responder: Responder) -> Result<(), ActorError> {
        let Shout(text) = request.take::<Shout>()?;
        match text.as_str() {
            "bad" => Err(ActorError::failed(DemoError::InvalidInput(text))),
            "panic" => panic!("shouter lost its voice"),
            _ => {
                responder.ok(text.to_uppercase());
                Ok(())
            }
        }
    }
}
