// Placeholder login check and cookie route gate

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

pub const AUTH_COOKIE: &str = "admin_auth";
pub const AUTH_COOKIE_VALUE: &str = "1";
pub const LOGIN_PATH: &str = "/login";

const DEMO_CREDENTIAL: &str = "admin";
const WRONG_CREDENTIALS: &str = "Неверный логин или пароль";

/// Paths reachable without the auth cookie (prefix match)
pub const PUBLIC_PATHS: &[&str] = &["/login", "/_next", "/favicon.ico", "/api/login", "/api/logout"];

/// Body of a login POST
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// HTTP-shaped login result
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub status: u16,
    pub body: Value,
    /// `Set-Cookie` header value on success
    pub set_cookie: Option<String>,
}

impl LoginOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Check a raw JSON login body; a malformed body counts as missing fields
pub fn login(body: &str) -> LoginOutcome {
    let request: LoginRequest = serde_json::from_str(body).unwrap_or_default();
    check_credentials(&request)
}

pub fn check_credentials(request: &LoginRequest) -> LoginOutcome {
    let accepted =
        request.login.as_deref() == Some(DEMO_CREDENTIAL) && request.password.as_deref() == Some(DEMO_CREDENTIAL);

    if accepted {
        info!("Login accepted");
        LoginOutcome {
            status: 200,
            body: json!({ "ok": true }),
            set_cookie: Some(format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                AUTH_COOKIE, AUTH_COOKIE_VALUE
            )),
        }
    } else {
        debug!(login = ?request.login, "Login rejected");
        LoginOutcome {
            status: 401,
            body: json!({ "message": WRONG_CREDENTIALS }),
            set_cookie: None,
        }
    }
}

/// What the gate does with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Redirect target, carrying the original path as `next`
    Redirect(String),
}

/// Decide whether `path` may be served given the auth cookie's value
pub fn gate(path: &str, auth_cookie: Option<&str>) -> GateDecision {
    if PUBLIC_PATHS.iter().any(|p| path.starts_with(p)) {
        return GateDecision::Allow;
    }
    if auth_cookie == Some(AUTH_COOKIE_VALUE) {
        return GateDecision::Allow;
    }
    GateDecision::Redirect(format!("{}?next={}", LOGIN_PATH, urlencoding::encode(path)))
}

/// Value of `name` in a `Cookie` request header
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
