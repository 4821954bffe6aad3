use serde::Serialize;

/// State of a repository use case as observed by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn error(err: &anyhow::Error) -> Self {
        Self::Error(format!("{err:#}"))
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// `Some` for a finished state, `None` while loading.
    pub fn into_result(self) -> Option<anyhow::Result<T>> {
        match self {
            Self::Loading => None,
            Self::Success(value) => Some(Ok(value)),
            Self::Error(message) => Some(Err(anyhow::anyhow!(message))),
        }
    }
}

impl<T> From<anyhow::Result<T>> for Outcome<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn test_error_keeps_message_verbatim() {
        let outcome: Outcome<()> = Outcome::error(&anyhow!("network down"));
        assert_eq!(outcome, Outcome::Error("network down".to_string()));
    }

    #[test]
    fn test_error_includes_context_chain() {
        let err = Err::<(), _>(anyhow!("connection refused"))
            .context("Failed to reach EasyMeal API")
            .unwrap_err();
        let outcome: Outcome<()> = Outcome::error(&err);
        assert_eq!(
            outcome,
            Outcome::Error("Failed to reach EasyMeal API: connection refused".to_string())
        );
    }

    #[test]
    fn test_from_result() {
        let ok: Outcome<i32> = Ok(3).into();
        assert_eq!(ok, Outcome::Success(3));
        let failed: Outcome<i32> = Err(anyhow!("boom")).into();
        assert_eq!(failed, Outcome::Error("boom".to_string()));
    }

    #[test]
    fn test_into_result() {
        assert!(Outcome::<i32>::Loading.into_result().is_none());
        assert_eq!(Outcome::Success(5).into_result().unwrap().unwrap(), 5);
        let err = Outcome::<i32>::Error("nope".to_string())
            .into_result()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let json = serde_json::to_value(Outcome::Success(vec![1, 2])).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], serde_json::json!([1, 2]));

        let json = serde_json::to_value(Outcome::<()>::Loading).unwrap();
        assert_eq!(json["status"], "loading");
    }
}
