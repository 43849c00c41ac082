use super::ApiError;

pub fn validate_account_id(id: i64) -> Result<i64, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid account ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

/// Bounds the batch size only. Ids that match no account are skipped by the
/// kick itself.
pub fn validate_kick_ids(ids: &[i64]) -> Result<&[i64], ApiError> {
    const MAX_IDS: usize = 1000;

    if ids.is_empty() {
        return Err(ApiError::validation("At least one account ID is required"));
    }
    if ids.len() > MAX_IDS {
        return Err(ApiError::validation(format!(
            "Too many account IDs: {}. At most {MAX_IDS} per request",
            ids.len()
        )));
    }
    Ok(ids)
}
