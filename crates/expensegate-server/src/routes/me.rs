//! The authenticated caller

use axum::Json;
use expensegate_auth::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::CurrentPrincipal;

/// Public view of a principal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub authorities: Vec<String>,
}

/// `GET /api/me`
pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<PrincipalView> {
    Json(PrincipalView {
        id: principal.id,
        username: principal.username.clone(),
        email: principal.email.clone(),
        role: principal.role,
        authorities: principal.authorities(),
    })
}
