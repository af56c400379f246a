use super::document::Fields;

/// A push destination registered by a client app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceToken(pub String);

impl DeviceToken {
    /// Reads the `token` field; missing, non-string and empty values are skipped.
    pub fn from_fields(fields: &Fields) -> Option<Self> {
        fields
            .get("token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| DeviceToken(t.to_string()))
    }
}
