use serde::Serialize;
use utoipa::ToSchema;

/// Liveness response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Health check shared by every VFS HTTP surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Returns a `HealthRes` indicating the service is healthy.
    ///
    /// Storage is not probed; a running process is considered alive.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "VFS is alive".into(),
        }
    }
}
