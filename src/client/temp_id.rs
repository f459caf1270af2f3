use chrono::Utc;
use uuid::Uuid;

pub const TEMP_ID_PREFIX: &str = "temp_";

/// `temp_<epochMillis>_<9 random lowercase alphanumerics>`
pub fn generate_temp_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}",
        TEMP_ID_PREFIX,
        Utc::now().timestamp_millis(),
        &random[..9]
    )
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
