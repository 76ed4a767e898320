//! Page type → output destination.
//!
//! | `Type` property | Classification | Written to | In navigation |
//! |-----------------|----------------|------------|---------------|
//! | `Home` | [`Classification::Home`] | `index.md` | no |
//! | `Page` | [`Classification::NavPage`] | `_pages/<slug>.md` | yes |
//! | anything else, or unset | [`Classification::HiddenPage`] | `_pages/<slug>.md` | no |
//!
//! Matching is exact and case-sensitive: `home` is a hidden page, not the
//! homepage. Hidden pages are still generated and reachable by direct link,
//! mirroring how unnumbered content stays out of navigation.

use crate::types::{Classification, RemotePage};

pub const HOME_TYPE: &str = "Home";
pub const NAV_PAGE_TYPE: &str = "Page";

pub fn classify(page: &RemotePage) -> Classification {
    classify_type(&page.page_type)
}

pub fn classify_type(page_type: &str) -> Classification {
    match page_type {
        HOME_TYPE => Classification::Home,
        NAV_PAGE_TYPE => Classification::NavPage,
        _ => Classification::HiddenPage,
    }
}
