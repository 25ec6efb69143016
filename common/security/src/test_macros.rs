//! Test helper for attaching a bearer token and restaurant header to a request.
//! Usage: test_request_headers!(req, token = "<jwt>", restaurant = "<uuid>");
#[macro_export]
macro_rules! test_request_headers {
    ($req:expr, token = $token:expr, restaurant = $restaurant:expr) => {{
        let h = $req.headers_mut();
        h.insert(
            ::axum::http::header::AUTHORIZATION,
            ::axum::http::HeaderValue::from_str(&format!("Bearer {}", $token)).unwrap(),
        );
        h.insert(
            $crate::context::RESTAURANT_HEADER,
            ::axum::http::HeaderValue::from_str(&$restaurant.to_string()).unwrap(),
        );
    }};
    ($req:expr, token = $token:expr) => {{
        $req.headers_mut().insert(
            ::axum::http::header::AUTHORIZATION,
            ::axum::http::HeaderValue::from_str(&format!("Bearer {}", $token)).unwrap(),
        );
    }};
}
