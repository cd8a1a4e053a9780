/// Errors raised while parsing a Universal Spectrum Identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsiError {
    /// The identifier string is empty
    #[error("empty identifier")]
    Empty,

    /// A required colon-delimited field is missing or blank
    #[error("identifier '{usi}' is missing its {field} field")]
    MissingField {
        /// The identifier as given
        usi: String,
        /// Name of the missing field
        field: &'static str,
    },

    /// The collection field matches no known provider tag
    #[error("identifier '{usi}': collection '{collection}' matches no provider")]
    UnknownCollection {
        /// The identifier as given
        usi: String,
        /// The collection field
        collection: String,
    },

    /// The scan locator kind or value is not understood
    #[error("identifier '{usi}': invalid scan locator '{kind}:{value}'")]
    InvalidLocator {
        /// The identifier as given
        usi: String,
        /// Locator kind (`scan`, `index`, `nativeId`)
        kind: String,
        /// Locator value
        value: String,
    },
}
