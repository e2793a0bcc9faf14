use axum::response::IntoResponse;

/// Undocumented banner route; useful as a cheap liveness probe.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, response::IntoResponse};

    #[tokio::test]
    async fn root_returns_name_and_version() {
        let response = root().await.into_response();
        let body = to_bytes(response.into_body(), 1024).await.expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.starts_with(env!("CARGO_PKG_NAME")));
        assert!(text.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
