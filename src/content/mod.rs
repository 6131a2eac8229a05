//! Content kinds and the prompt/output formatter.
//!
//! The formatter is pure: it shapes the instruction sent to the generation
//! provider for a given content kind and normalizes the provider's raw text
//! into the kind's native units (thread segments for twitter, a single block
//! for everything else).

mod formatter;
mod kind;

pub use formatter::{
    build_prompt, export_file_name, join_units, parse_output, FormatError, MAX_TWEET_LENGTH,
    TWEET_THREAD_LENGTH, UNIT_SEPARATOR,
};
pub use kind::ContentKind;
