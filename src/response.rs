use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

/// `201 Created` with the data envelope.
pub struct Created<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(Data::new(self.0))).into_response()
    }
}

/// Message-only envelope: `{"message": ...}`.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for Message {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}
