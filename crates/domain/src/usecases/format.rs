//! Formatting use case - turns an application record into post text

use time::Date;

use crate::model::{ApplicationRecord, Post};

/// Configuration for the formatter
#[derive(Debug, Clone)]
pub struct FormatConfig {
    /// Maximum displayed address length, in characters
    pub address_max_chars: usize,
    /// Marker appended to a truncated address
    pub ellipsis: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            address_max_chars: 36,
            ellipsis: "…".to_string(),
        }
    }
}

/// Formatter for application records
#[derive(Debug, Clone)]
pub struct PostFormatter {
    config: FormatConfig,
}

impl PostFormatter {
    pub fn new(config: FormatConfig) -> Self {
        Self { config }
    }

    /// Format a record into a post
    pub fn format(&self, record: &ApplicationRecord) -> Post {
        let name = applicant_display_name(record.applicant_name.as_deref());
        let address = truncate_words(
            &record.development_address,
            self.config.address_max_chars,
            &self.config.ellipsis,
        );

        let text = format!(
            "New {} planning application from {} at {}. Registered on {}.\n\n{}",
            record.application_type,
            name,
            address,
            format_date(record.registered_date),
            record.url
        );

        Post {
            source_pk: record.pk.clone(),
            text,
            coordinates: record.location,
        }
    }
}

fn applicant_display_name(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.trim().is_empty() => name,
        _ => "Unknown",
    }
}

/// Render a date as "04 March 2021"
pub fn format_date(date: Date) -> String {
    format!("{:02} {} {}", date.day(), date.month(), date.year())
}

/// Truncate to at most `max_len` characters on a word boundary.
///
/// Takes the first `max_len + 1` characters, drops the last space-separated
/// word (which may be partial) and appends `suffix`. Content without a space
/// in range collapses to just the suffix.
pub fn truncate_words(content: &str, max_len: usize, suffix: &str) -> String {
    if content.chars().count() <= max_len {
        return content.to_string();
    }

    let head: String = content.chars().take(max_len + 1).collect();
    let mut words: Vec<&str> = head.split(' ').collect();
    words.pop();

    format!("{}{}", words.join(" "), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;
    use time::macros::date;

    fn sample_record() -> ApplicationRecord {
        ApplicationRecord {
            pk: "42".to_string(),
            application_type: "Householder".to_string(),
            applicant_name: Some("Jane Smith".to_string()),
            development_address: "1 Example Street London NW1 1AA".to_string(),
            registered_date: date!(2021 - 03 - 04),
            url: "http://planningrecords.camden.gov.uk/app/42".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_format_uses_fixed_template() {
        let formatter = PostFormatter::new(FormatConfig::default());

        let post = formatter.format(&sample_record());

        assert_eq!(
            post.text,
            "New Householder planning application from Jane Smith at \
             1 Example Street London NW1 1AA. Registered on 04 March 2021.\
             \n\nhttp://planningrecords.camden.gov.uk/app/42"
        );
        assert_eq!(post.source_pk, "42");
        assert!(post.coordinates.is_none());
    }

    #[test]
    fn test_missing_or_blank_name_is_unknown() {
        let formatter = PostFormatter::new(FormatConfig::default());
        let mut record = sample_record();

        record.applicant_name = None;
        assert!(formatter.format(&record).text.contains("from Unknown at"));

        record.applicant_name = Some("   ".to_string());
        assert!(formatter.format(&record).text.contains("from Unknown at"));
    }

    #[test]
    fn test_long_address_is_truncated() {
        let formatter = PostFormatter::new(FormatConfig::default());
        let mut record = sample_record();
        record.development_address =
            "Flat 3, 125 Somewhere Really Long Road, London NW5 2AB".to_string();

        let post = formatter.format(&record);

        assert!(post.text.contains("at Flat 3, 125 Somewhere Really Long…. Registered"));
    }

    #[test]
    fn test_coordinates_carried_to_post() {
        let formatter = PostFormatter::new(FormatConfig::default());
        let mut record = sample_record();
        record.location = Some(Coordinates {
            latitude: 51.5,
            longitude: -0.14,
        });

        let post = formatter.format(&record);

        assert_eq!(post.coordinates, record.location);
    }

    #[test]
    fn test_truncate_drops_partial_word() {
        let result = truncate_words("The quick brown fox jumps", 10, "…");
        assert_eq!(result, "The quick…");
    }

    #[test]
    fn test_truncate_keeps_word_ending_at_limit() {
        // Character max_len + 1 is a space, so the last whole word survives
        let result = truncate_words("The quick brown fox", 9, "...");
        assert_eq!(result, "The quick...");
    }

    #[test]
    fn test_truncate_short_content_unchanged() {
        assert_eq!(truncate_words("Short", 10, "…"), "Short");
        assert_eq!(truncate_words("Exactly10!", 10, "…"), "Exactly10!");
    }

    #[test]
    fn test_truncate_without_space_collapses() {
        assert_eq!(truncate_words("Abcdefghijklmnop", 5, "…"), "…");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let result = truncate_words("Café Église Rue", 11, "…");
        assert_eq!(result, "Café Église…");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(date!(2024 - 12 - 25)), "25 December 2024");
    }
}
