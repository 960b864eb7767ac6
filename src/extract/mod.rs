//! HTML extraction: selector chains, slugs, listings

pub mod chain;
pub mod listing;
pub mod slug;
pub mod text;

pub use chain::{FieldChain, ListChain};
pub use listing::{extract_listing, has_next_page, ListingContext, SlugRule, DEFAULT_PATTERNS};
pub use slug::{series_slug_from_unit, series_slug_from_url, slug_after, slug_from_url};
pub use text::{absolute_url, clean_text, infer_quality, sort_units_ascending, unit_number};
