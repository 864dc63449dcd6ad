use axum::http::HeaderMap;

pub mod geo;

/// 代理转发的客户端地址头
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// 无法识别客户端时使用的标识
pub const UNKNOWN_CLIENT: &str = "unknown";

/// 取 `x-forwarded-for` 中的第一个地址作为客户端标识
pub fn client_identifier(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
