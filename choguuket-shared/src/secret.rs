use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a secret (bot token, API key) so it never shows up in `Debug` or `Display` output.
///
/// Config structs derive `Debug` and get logged at startup; wrapping the sensitive fields
/// keeps `tracing::info!("{:?}", config)` safe. Use [`Masked::expose`] at the call site that
/// actually needs the value.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialization is for round-tripping config, not for logs.
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_masked() {
        let token = Masked::new("123456:ABC-DEF".to_string());
        assert_eq!(format!("{:?}", token), "********");
        assert_eq!(format!("{}", token), "********");
        assert_eq!(token.expose(), "123456:ABC-DEF");
    }

    #[test]
    fn test_deserializes_transparently() {
        #[derive(Debug, Deserialize)]
        struct Section {
            token: Masked<String>,
        }

        let section: Section = serde_json::from_str(r#"{"token":"secret"}"#).unwrap();
        assert_eq!(section.token.expose(), "secret");
    }
}
