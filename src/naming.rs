//! Title → filename conventions for generated pages.
//!
//! Every non-home page lands at `<pages_dir>/<slug>.md`, where the slug is
//! derived from the page title alone:
//!
//! - `"About Us"` → `about-us`
//! - `"Q&A: Part 2"` → `q-a-part-2`
//! - `"  Café   Notes "` → `café-notes`
//!
//! Slugs are not guaranteed unique. Two titles that differ only in
//! punctuation or case map to the same file; the later page wins (see
//! [`crate::sync`]).

/// Lower-case `title`, keep alphanumerics, and collapse every other run of
/// characters into a single `-`. Leading and trailing dashes are trimmed.
///
/// Returns an empty string when the title has no alphanumeric characters.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Slug for a page, falling back to its id when the title has nothing
/// usable in it.
pub fn page_slug(title: &str, page_id: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        let id: String = page_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        format!("page-{id}")
    } else {
        slug
    }
}

/// Site-relative permalink for a slug: `about-us` → `/about-us/`.
pub fn permalink(slug: &str) -> String {
    format!("/{slug}/")
}

/// File stem of the last path segment of a URL, used as image alt text.
///
/// `https://cdn.example.com/img/sunset.final.jpg?X-Amz=1` → `sunset.final`
pub fn url_file_stem(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    match last.rfind('.') {
        Some(dot) if dot > 0 => last[..dot].to_string(),
        _ => last.to_string(),
    }
}
