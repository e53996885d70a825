//! Tests for error types

#[cfg(test)]
mod tests {
    use super::super::error::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnknownVariable("weather".into());
        assert_eq!(err.to_string(), "Unknown variable: weather");

        let err = EngineError::InvalidState {
            variable: "home_form".into(),
            state: "stellar".into(),
        };
        assert_eq!(err.to_string(), "Invalid state 'stellar' for variable 'home_form'");

        let err = EngineError::InferenceNonconvergence { samples: 1000, delta: 0.25 };
        assert!(err.to_string().contains("1000 samples"));
    }

    #[test]
    fn test_caller_errors() {
        assert!(EngineError::MalformedFact("x".into()).is_caller_error());
        assert!(EngineError::ImpossibleEvidence.is_caller_error());
        assert!(!EngineError::Config("x".into()).is_caller_error());
        assert!(!EngineError::InvalidNetwork("x".into()).is_caller_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EngineError = json_err.into();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }
}
