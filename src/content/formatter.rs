//! Prompt shaping and provider-output normalization.

use chrono::NaiveDate;
use thiserror::Error;

use super::kind::ContentKind;

/// Separator between thread segments in provider output, and the join
/// separator used when persisting units as a single history string.
pub const UNIT_SEPARATOR: &str = "\n\n";

/// Per-segment length communicated to the provider for twitter threads.
/// Advisory only: over-length segments are never truncated or rejected.
pub const MAX_TWEET_LENGTH: usize = 280;

/// Number of segments requested for a twitter thread.
pub const TWEET_THREAD_LENGTH: usize = 5;

/// Errors from normalizing provider output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The provider returned text that yields no non-empty unit.
    #[error("provider output contained no usable segments")]
    NoUsableSegments,
}

/// Build the provider instruction for a content kind.
///
/// `has_attachment` only affects instagram, where an attached image is
/// described and woven into the caption.
pub fn build_prompt(kind: ContentKind, prompt: &str, has_attachment: bool) -> String {
    let mut instruction = format!("Generate {} content about \"{}\".", kind, prompt);

    match kind {
        ContentKind::Twitter => {
            instruction.push_str(&format!(
                " Provide a thread of {} tweets, each under {} characters.",
                TWEET_THREAD_LENGTH, MAX_TWEET_LENGTH
            ));
        }
        ContentKind::Youtube => {
            instruction.push_str(
                " Create a compelling YouTube video script with an engaging hook, \
                 main content points, and call-to-action. Include timestamps and \
                 speaking notes.",
            );
        }
        ContentKind::Instagram => {
            if has_attachment {
                instruction
                    .push_str(" Describe the image and incorporate it into the caption.");
            }
        }
        ContentKind::Linkedin => {
            instruction.push_str(" Write in a professional tone suited to LinkedIn.");
        }
    }

    instruction
}

/// Normalize raw provider text into the kind's units.
///
/// Thread kinds split on [`UNIT_SEPARATOR`], trim each candidate, and drop
/// empties while preserving order. Single-block kinds pass the raw text
/// through unchanged as one unit. Either way at least one non-empty unit is
/// guaranteed, otherwise [`FormatError::NoUsableSegments`] is returned.
pub fn parse_output(kind: ContentKind, raw: &str) -> Result<Vec<String>, FormatError> {
    if kind.is_threaded() {
        let units: Vec<String> = raw
            .split(UNIT_SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if units.is_empty() {
            return Err(FormatError::NoUsableSegments);
        }
        Ok(units)
    } else {
        if raw.trim().is_empty() {
            return Err(FormatError::NoUsableSegments);
        }
        Ok(vec![raw.to_string()])
    }
}

/// Join units back into the persisted single-string form.
pub fn join_units(units: &[String]) -> String {
    units.join(UNIT_SEPARATOR)
}

/// Filename for exporting a generation as plain text.
pub fn export_file_name(kind: ContentKind, date: NaiveDate) -> String {
    format!("{}-content-{}.txt", kind, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twitter_prompt_requests_thread() {
        let instruction = build_prompt(ContentKind::Twitter, "rust async", false);
        assert!(instruction.starts_with("Generate twitter content about \"rust async\"."));
        assert!(instruction.contains("thread of 5 tweets"));
        assert!(instruction.contains("under 280 characters"));
    }

    #[test]
    fn test_youtube_prompt_requests_script_structure() {
        let instruction = build_prompt(ContentKind::Youtube, "sourdough", false);
        assert!(instruction.contains("engaging hook"));
        assert!(instruction.contains("call-to-action"));
        assert!(instruction.contains("timestamps"));
    }

    #[test]
    fn test_instagram_prompt_mentions_image_only_with_attachment() {
        let without = build_prompt(ContentKind::Instagram, "coffee", false);
        assert!(!without.contains("Describe the image"));

        let with = build_prompt(ContentKind::Instagram, "coffee", true);
        assert!(with.contains("Describe the image and incorporate it into the caption."));
    }

    #[test]
    fn test_linkedin_prompt_has_tone_guidance_only() {
        let instruction = build_prompt(ContentKind::Linkedin, "hiring", false);
        assert!(instruction.contains("professional tone"));
        assert!(!instruction.contains("tweets"));
        assert!(!instruction.contains("image"));
    }

    #[test]
    fn test_twitter_split_discards_empty_segments() {
        let units = parse_output(ContentKind::Twitter, "A\n\nB\n\n\nC").expect("units");
        assert_eq!(units, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_twitter_split_preserves_order_and_trims() {
        let units =
            parse_output(ContentKind::Twitter, "  first  \n\nsecond\n\n  third").expect("units");
        assert_eq!(units, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_twitter_output_with_no_segments_fails() {
        let err = parse_output(ContentKind::Twitter, "\n\n  \n\n").unwrap_err();
        assert_eq!(err, FormatError::NoUsableSegments);
    }

    #[test]
    fn test_single_block_kinds_pass_through_unchanged() {
        for kind in [
            ContentKind::Instagram,
            ContentKind::Linkedin,
            ContentKind::Youtube,
        ] {
            let raw = "Line one\n\nLine two";
            let units = parse_output(kind, raw).expect("units");
            assert_eq!(units, vec![raw.to_string()]);
        }
    }

    #[test]
    fn test_single_block_empty_output_fails() {
        let err = parse_output(ContentKind::Linkedin, "   ").unwrap_err();
        assert_eq!(err, FormatError::NoUsableSegments);
    }

    #[test]
    fn test_overlength_tweet_is_kept_verbatim() {
        let long = "x".repeat(MAX_TWEET_LENGTH + 40);
        let raw = format!("short\n\n{}", long);
        let units = parse_output(ContentKind::Twitter, &raw).expect("units");
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].len(), MAX_TWEET_LENGTH + 40);
    }

    #[test]
    fn test_join_units_uses_documented_separator() {
        let units = vec!["A".to_string(), "B".to_string()];
        assert_eq!(join_units(&units), "A\n\nB");
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).expect("date");
        assert_eq!(
            export_file_name(ContentKind::Twitter, date),
            "twitter-content-2026-08-23.txt"
        );
    }
}
