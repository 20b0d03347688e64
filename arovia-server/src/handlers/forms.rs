//! Body plumbing shared by the routes that accept either a JSON body or a
//! multipart form with an attached file (register, profile update).

use crate::error::{ApiError, ApiResult};
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::{FromRequest, Request};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// An uploaded file pulled out of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("File is too large (maximum 5 MB)")
    } else {
        ApiError::validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

// Multipart text fields arrive untyped; the client's form encoder sends
// booleans as literals and the address as a JSON object string.
fn coerce_field_value(text: String) -> Value {
    match text.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if text.trim_start().starts_with('{') {
                if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text) {
                    return value;
                }
            }
            Value::String(text)
        }
    }
}

/// Drain a multipart form into a JSON object plus the file part named
/// `file_field`, if one was attached.
pub async fn collect_form(
    mut multipart: Multipart,
    file_field: &str,
) -> ApiResult<(Map<String, Value>, Option<FilePart>)> {
    let mut fields = Map::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field && field.file_name().is_some() {
            let original_name = field
                .file_name()
                .map(|n| n.to_string())
                .unwrap_or_default();
            let content_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
            file = Some(FilePart {
                original_name,
                content_type,
                bytes,
            });
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(name, coerce_field_value(text));
        }
    }

    Ok((fields, file))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Read a request body as `T`, accepting either JSON or a multipart form
/// whose text fields deserialize into `T` and whose `file_field` part (when
/// present) is returned alongside.
pub async fn read_json_or_multipart<T: DeserializeOwned>(
    request: Request,
    file_field: &str,
) -> ApiResult<(T, Option<FilePart>)> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?;
        let (fields, file) = collect_form(multipart, file_field).await?;
        let payload = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ApiError::validation(format!("Invalid request body: {e}")))?;
        Ok((payload, file))
    } else {
        let axum::Json(payload) = axum::Json::<T>::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok((payload, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_and_objects_are_coerced() {
        assert_eq!(coerce_field_value("true".into()), Value::Bool(true));
        assert_eq!(coerce_field_value("false".into()), Value::Bool(false));
        assert_eq!(
            coerce_field_value("9876543210".into()),
            Value::String("9876543210".into())
        );
        let address = coerce_field_value(r#"{"city":"Pune"}"#.into());
        assert_eq!(address["city"], "Pune");
        // Broken JSON falls back to a plain string.
        assert!(matches!(
            coerce_field_value("{not json".into()),
            Value::String(_)
        ));
    }
}
