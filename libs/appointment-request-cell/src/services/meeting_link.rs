// libs/appointment-request-cell/src/services/meeting_link.rs
use chrono::NaiveDate;

const ROOM_PREFIX: &str = "CareConnect";

/// Derive the video-conference room URL for an approved online meeting.
///
/// The same (patient, doctor, date, time) tuple always yields the same URL,
/// so the link can be regenerated for repeated lookups instead of stored
/// state being the only source of truth. Collisions between distinct
/// requests sharing the full tuple are accepted.
pub fn generate(
    base_url: &str,
    patient_name: &str,
    doctor_name: &str,
    date: NaiveDate,
    time: &str,
) -> String {
    let mut room = String::from(ROOM_PREFIX);
    room.push_str(&strip_whitespace(patient_name));
    room.push_str(&strip_whitespace(doctor_name));
    room.push_str(&date.format("%Y-%m-%d").to_string());
    room.push_str(&time.replace(':', ""));

    let room: String = room
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();

    format!("{}/{}", base_url.trim_end_matches('/'), room)
}

fn strip_whitespace(name: &str) -> String {
    name.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://meet.jit.si";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn link_is_deterministic() {
        let a = generate(BASE, "Jane Doe", "Dr. John Smith", date(2025, 6, 2), "11:00");
        let b = generate(BASE, "Jane Doe", "Dr. John Smith", date(2025, 6, 2), "11:00");
        assert_eq!(a, b);
    }

    #[test]
    fn link_carries_prefix_and_schedule() {
        let link = generate(BASE, "Jane Doe", "Dr. John Smith", date(2025, 6, 2), "11:00");
        assert!(link.starts_with("https://meet.jit.si/CareConnect"));
        assert!(link.contains("2025-06-02"));
        assert!(link.ends_with("1100"));
    }

    #[test]
    fn names_are_stripped_of_whitespace_and_punctuation() {
        let link = generate(BASE, "Mary Anne O'Brien", "Dr. Pat Murphy", date(2025, 1, 9), "09:30");
        // Whitespace, apostrophes and dots are all dropped from the room name.
        assert_eq!(
            link,
            "https://meet.jit.si/CareConnectMaryAnneOBrienDrPatMurphy2025-01-090930"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let with_slash = generate("https://meet.jit.si/", "A", "B", date(2025, 3, 1), "08:00");
        let without = generate(BASE, "A", "B", date(2025, 3, 1), "08:00");
        assert_eq!(with_slash, without);
    }
}
