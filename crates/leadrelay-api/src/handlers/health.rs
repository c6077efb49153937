/// Heartbeat
#[utoipa::path(
    get,
    path = "/ping",
    tag = "health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn ping() -> &'static str {
    "."
}
