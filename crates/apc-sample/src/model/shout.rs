/// Text to be shouted back in upper case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shout(pub String);

impl From<&str> for Shout {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}
