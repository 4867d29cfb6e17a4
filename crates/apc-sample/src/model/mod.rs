//! Request and reply types exchanged between the sample actors.

pub mod calc;
pub mod ping;
pub mod shout;

pub use calc::*;
pub use ping::*;
pub use shout::*;
