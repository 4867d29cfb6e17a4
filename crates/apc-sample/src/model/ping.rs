use std::fmt::Display;

/// A numbered ping. The reply carries the same sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub seq: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PongReply {
    pub seq: u32,
    /// Name of the actor that answered.
    pub by: String,
    /// How many pings that actor has answered so far, this one included.
    pub served: u32,
}

impl Display for PongReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pong #{} from {} ({} served)", self.seq, self.by, self.served)
    }
}
