//! Six-digit email verification codes.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

pub const CODE_LENGTH: usize = 6;

/// A uniformly drawn code in `100000..=999999`.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

pub fn expires_at(issued_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    issued_at + ttl
}

/// Seconds left before another code may be sent, `None` when a resend is allowed.
pub fn resend_wait(
    last_sent: Option<DateTime<Utc>>,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<i64> {
    let last_sent = last_sent?;
    let ready_at = last_sent + cooldown;
    if now < ready_at {
        let remaining = (ready_at - now).num_milliseconds();
        Some((remaining + 999) / 1000)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_codes_are_six_digits_in_range() {
        for _ in 0..500 {
            let code = generate_code();
            assert!(is_well_formed(&code), "{code}");
            let value: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn well_formed_rejects_wrong_length_and_letters() {
        assert!(is_well_formed("012345"));
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("1234567"));
        assert!(!is_well_formed("12a456"));
    }

    #[test]
    fn code_expires_fifteen_minutes_after_issue() {
        let issued = Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap();
        let expiry = expires_at(issued, Duration::minutes(15));
        assert_eq!(expiry, Utc.with_ymd_and_hms(2025, 5, 12, 8, 15, 0).unwrap());
    }

    #[test]
    fn resend_wait_counts_down_cooldown() {
        let sent = Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap();
        let cooldown = Duration::seconds(60);

        assert_eq!(resend_wait(None, cooldown, sent), None);
        assert_eq!(resend_wait(Some(sent), cooldown, sent + Duration::seconds(20)), Some(40));
        assert_eq!(
            resend_wait(Some(sent), cooldown, sent + Duration::milliseconds(59_500)),
            Some(1)
        );
        assert_eq!(resend_wait(Some(sent), cooldown, sent + Duration::seconds(60)), None);
    }
}
