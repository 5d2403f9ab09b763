use chrono::{DateTime, Local, TimeZone};

/// A user id for the request header: 32 lowercase hex characters, the
/// longest uid the service accepts.
pub fn new_uid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A chat id stamped with the current local time.
pub fn new_chat_id() -> String {
    new_chat_id_at(&Local::now())
}

/// A chat id of the form `yymmddHHMMSS_xxxxxxxx`.
pub fn new_chat_id_at<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{}_{:02x}{:02x}{:02x}{:02x}",
        now.format("%y%m%d%H%M%S"),
        bytes[0],
        bytes[1],
        bytes[2],
        bytes[3]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn uid_is_32_hex_chars() {
        let uid = new_uid();
        assert_eq!(uid.len(), 32);
        assert!(uid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn uid_is_unique() {
        assert_ne!(new_uid(), new_uid());
    }

    #[test]
    fn chat_id_embeds_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let id = new_chat_id_at(&now);
        let (stamp, suffix) = id.split_once('_').unwrap();
        assert_eq!(stamp, "240309140507");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn chat_id_suffix_is_random() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_ne!(new_chat_id_at(&now), new_chat_id_at(&now));
    }

    #[test]
    fn chat_id_uses_local_clock() {
        let id = new_chat_id();
        assert_eq!(id.len(), 12 + 1 + 8);
    }
}
