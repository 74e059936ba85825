use serde::{Deserialize, Serialize};

/// A platform user. Search results omit everything but the id and username,
/// so the account fields all default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub role: Option<String>,
}

/// Access/refresh credential pair issued by login, register, and refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response body of `POST /auth/login` and `POST /auth/register`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub user: Option<User>,
    pub tokens: Tokens,
}
