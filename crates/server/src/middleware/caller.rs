use axum::{extract::Request, middleware::Next, response::Response};

/// Header set by the authentication layer in front of this service
pub const USER_ID_HEADER: &str = "x-user-id";

/// Opaque caller identity stamped into `created_by` and `changed_by`
#[derive(Clone, Debug, Default)]
pub struct CallerIdentity(pub Option<String>);

impl CallerIdentity {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

pub async fn caller_middleware(mut request: Request, next: Next) -> Response {
    let caller = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    request.extensions_mut().insert(CallerIdentity(caller));
    next.run(request).await
}
