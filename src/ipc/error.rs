use crate::error::SchoolError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Failure of a single handler, rendered into an error response by the caller.
#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<SchoolError> for HandlerErr {
    fn from(e: SchoolError) -> Self {
        match e {
            SchoolError::NotFound { entity, key } => HandlerErr {
                code: "not_found",
                message: format!("{} not found", entity),
                details: Some(json!({ "entity": entity, "key": key })),
            },
            SchoolError::Conflict(kind) => HandlerErr {
                code: "conflict",
                message: kind.to_string(),
                details: Some(json!({ "kind": kind.code() })),
            },
            SchoolError::InvalidInput(message) => HandlerErr::bad_params(message),
            SchoolError::Db(e) => HandlerErr {
                code: "db_query_failed",
                message: e.to_string(),
                details: None,
            },
        }
    }
}

impl From<rusqlite::Error> for HandlerErr {
    fn from(e: rusqlite::Error) -> Self {
        SchoolError::Db(e).into()
    }
}
