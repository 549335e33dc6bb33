// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::Application;
use crate::hub::Hub;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_count: usize,
}

/// `GET /health`
pub async fn health<A: Application>(State(hub): State<Arc<Hub<A>>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), session_count: hub.session_count().await })
}
