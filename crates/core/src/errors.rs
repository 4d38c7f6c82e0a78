use thiserror::Error;

/// Failure reported at the HTTP boundary, tagged with the request's correlation id.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Client-facing text; goes into the `detail` field unchanged.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::InterfaceError;

    #[test]
    fn message_and_correlation_id_are_exposed_for_every_variant() {
        let errors = [
            InterfaceError::BadRequest { message: "Invalid product IDs".into(), correlation_id: "r1".into() },
            InterfaceError::NotFound { message: "Order not found".into(), correlation_id: "r2".into() },
            InterfaceError::ServiceUnavailable { message: "graph down".into(), correlation_id: "r3".into() },
            InterfaceError::Internal { message: "boom".into(), correlation_id: "r4".into() },
        ];

        let messages: Vec<&str> = errors.iter().map(InterfaceError::message).collect();
        let ids: Vec<&str> = errors.iter().map(InterfaceError::correlation_id).collect();
        assert_eq!(messages, ["Invalid product IDs", "Order not found", "graph down", "boom"]);
        assert_eq!(ids, ["r1", "r2", "r3", "r4"]);
    }

    #[test]
    fn display_names_the_failure_class() {
        let error =
            InterfaceError::NotFound { message: "Product not found".into(), correlation_id: "r".into() };
        assert_eq!(error.to_string(), "not found: Product not found");
    }
}
