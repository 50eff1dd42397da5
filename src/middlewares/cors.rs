use actix_cors::Cors;

/// The HTTP surface is read-mostly dashboards plus JSON POSTs (admin ops
/// and batch submission); plays ride the WebSocket, and nothing uses
/// cookies or auth headers, so credentialless requests from any origin are
/// acceptable. GET/POST cover every route; OPTIONS is for preflight.
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
