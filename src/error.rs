use derive_more::From;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    #[from]
    Json(serde_json::Error),

    #[from]
    Http(reqwest::Error),

    #[from]
    Kube(kube::Error),

    #[from]
    Infer(kube::config::InferConfigError),

    #[from]
    Io(std::io::Error),

    /// Backend answered with a non-2xx status
    Status { url: String, code: u16 },

    /// Response body did not have the expected shape
    Malformed { what: String },

    /// Unknown resource type or object
    NotFound { what: String },

    /// Custom error message
    Custom(String),
}

impl Error {
    #[must_use]
    pub fn malformed(what: impl Into<String>) -> Self {
        Self::Malformed { what: what.into() }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            Self::Status { url, code } => write!(fmt, "GET {url} returned HTTP {code}"),
            Self::Malformed { what } => write!(fmt, "malformed response: {what}"),
            Self::NotFound { what } => write!(fmt, "not found: {what}"),
            Self::Custom(message) => write!(fmt, "{message}"),
            Self::Json(e) => write!(fmt, "json: {e}"),
            Self::Http(e) => write!(fmt, "http: {e}"),
            Self::Kube(e) => write!(fmt, "kube: {e}"),
            Self::Infer(e) => write!(fmt, "kube config: {e}"),
            Self::Io(e) => write!(fmt, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_names_url_and_code() {
        let err = Error::Status {
            url: "http://localhost:8080/list/pods".to_string(),
            code: 503,
        };
        assert_eq!(
            err.to_string(),
            "GET http://localhost:8080/list/pods returned HTTP 503"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
