use serde::{Deserialize, Serialize};

/// The authenticated user as reported by the identity provider.
///
/// The booking core only reads this record; signing in and out happens
/// entirely inside the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub signed_in: bool,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn signed_in(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            signed_in: true,
            display_name: Some(display_name.into()),
            email: Some(email.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}
