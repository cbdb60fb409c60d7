use crate::error::ApiError;

/// Uppercase and trim a PAN/Tax ID. The only hard rule is a minimum
/// length of 8 for non-empty values; empty clears the field.
pub fn normalize_pan(raw: &str) -> Result<String, ApiError> {
    let pan = raw.trim().to_uppercase();
    if !pan.is_empty() && pan.chars().count() < 8 {
        return Err(ApiError::InvalidPan);
    }
    Ok(pan)
}

/// Trim an Aadhaar/National ID: non-empty values must be exactly 12
/// digits; empty clears the field.
pub fn normalize_aadhaar(raw: &str) -> Result<String, ApiError> {
    let aadhaar = raw.trim().to_string();
    if aadhaar.is_empty() {
        return Ok(aadhaar);
    }
    if !aadhaar.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::InvalidAadhaar(
            "Aadhaar/National ID should be numeric.",
        ));
    }
    if aadhaar.chars().count() != 12 {
        return Err(ApiError::InvalidAadhaar(
            "Aadhaar/National ID should be 12 digits.",
        ));
    }
    Ok(aadhaar)
}
