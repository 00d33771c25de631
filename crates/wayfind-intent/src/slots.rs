//! Fixed-vocabulary slot extraction.
//!
//! Both extractors lower-case the input and return the first vocabulary
//! entry (in list order) contained anywhere in it. Matching is raw substring
//! containment with no word boundaries, so `"lab"` also matches `"label"`.

/// Known destinations, in scan order.
pub const LOCATIONS: [&str; 6] = [
    "room 101",
    "room 102",
    "lab a3",
    "library",
    "canteen",
    "admin office",
];

/// Known facility kinds, in scan order.
pub const FACILITY_TYPES: [&str; 5] = ["library", "canteen", "lab", "room", "office"];

fn first_contained(text: &str, vocabulary: &[&str]) -> String {
    let lowered = text.to_lowercase();
    vocabulary
        .iter()
        .find(|entry| lowered.contains(*entry))
        .map(|entry| entry.to_string())
        .unwrap_or_default()
}

/// Returns the first known location mentioned in `text`, or `""`.
pub fn extract_location(text: &str) -> String {
    first_contained(text, &LOCATIONS)
}

/// Returns the first known facility kind mentioned in `text`, or `""`.
pub fn extract_facility_type(text: &str) -> String {
    first_contained(text, &FACILITY_TYPES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_simple_match() {
        assert_eq!(extract_location("go to the canteen now"), "canteen");
    }

    #[test]
    fn location_is_case_insensitive() {
        assert_eq!(extract_location("Take me to ROOM 101"), "room 101");
    }

    #[test]
    fn location_uses_list_order_not_text_order() {
        // "canteen" appears first in the text but "library" comes first in the list.
        assert_eq!(
            extract_location("from the canteen to the library"),
            "library"
        );
        assert_eq!(extract_location("admin office or room 102"), "room 102");
    }

    #[test]
    fn location_none_matches() {
        assert_eq!(extract_location("where am i"), "");
        assert_eq!(extract_location(""), "");
    }

    #[test]
    fn facility_simple_match() {
        assert_eq!(extract_facility_type("where is the nearest lab"), "lab");
    }

    #[test]
    fn facility_matches_inside_words() {
        assert_eq!(extract_facility_type("read the label"), "lab");
        assert_eq!(extract_facility_type("a bathroom please"), "room");
    }

    #[test]
    fn facility_none_matches() {
        assert_eq!(extract_facility_type("nearest exit"), "");
    }
}
