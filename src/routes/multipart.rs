use actix_multipart::Field;
use futures_util::TryStreamExt;

use crate::core::AppError;

const TEXT_FIELD_LIMIT: usize = 1024 * 1024;

pub async fn read_field_bytes(field: &mut Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::validation_error(format!("Failed to read upload: {}", e)))?
    {
        data.extend_from_slice(&chunk);
        if data.len() > limit {
            return Err(AppError::validation_error(
                "Uploaded file exceeds the size limit",
            ));
        }
    }
    Ok(data)
}

pub async fn read_field_string(field: &mut Field) -> Result<String, AppError> {
    let bytes = read_field_bytes(field, TEXT_FIELD_LIMIT).await?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::validation_error("Form field is not valid UTF-8"))
}
