//! Field-level enrichment: foreign keys become human-readable names, emails
//! and hyperlink cells; wire timestamps become display timestamps. Every
//! resolver substitutes a descriptive sentinel on a missing reference so the
//! output row is always produced.

use chrono::NaiveDateTime;

use crate::config::Site;
use crate::index::RefIndex;
use crate::model::{EntityId, Tag};

pub const NO_BOOK: &str = "No Book";
pub const NO_CHAPTER: &str = "No Chapter";
pub const NO_PAGE: &str = "No Page Found";
pub const NO_SHELVES: &str = "No shelves found";
pub const NO_DESCRIPTION: &str = "No Description";
pub const NO_TAGS: &str = "No Tag(s)";
pub const UNKNOWN: &str = "Unknown";

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `2024-03-05T14:02:11.000000Z` -> `2024-03-05 14:02:11`. A value that does
/// not match the wire format passes through unchanged.
pub fn format_timestamp(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, WIRE_FORMAT) {
        Ok(parsed) => parsed.format(DISPLAY_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Null last-activity timestamps display as the literal "Unknown".
pub fn format_optional_timestamp(raw: Option<&str>) -> String {
    match raw {
        Some(value) => format_timestamp(value),
        None => UNKNOWN.to_string(),
    }
}

/// Clickable-hyperlink cell formula for the workbook.
pub fn hyperlink(url: &str) -> String {
    format!("=HYPERLINK(\"{url}\")")
}

/// Resolve a user id to a display name; miss -> "<Role> Unknown" where the
/// role is e.g. "Book Owner" or "Page Creator".
pub fn resolve_user_name(index: &RefIndex, id: EntityId, role: &str) -> String {
    index
        .user_names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("{role} Unknown"))
}

/// Resolve a user id to an email; miss -> "<Role> Email Unknown".
pub fn resolve_user_email(index: &RefIndex, id: EntityId, role: &str) -> String {
    index
        .user_emails
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("{role} Email Unknown"))
}

/// Owner lookups reached through a parent reference: a missing parent yields
/// the same sentinel as a missing user.
pub fn resolve_user_name_opt(index: &RefIndex, id: Option<EntityId>, role: &str) -> String {
    match id {
        Some(id) => resolve_user_name(index, id, role),
        None => format!("{role} Unknown"),
    }
}

pub fn resolve_user_email_opt(index: &RefIndex, id: Option<EntityId>, role: &str) -> String {
    match id {
        Some(id) => resolve_user_email(index, id, role),
        None => format!("{role} Email Unknown"),
    }
}

/// Display name + hyperlink cell for a page's or chapter's parent book.
pub fn resolve_book(index: &RefIndex, site: &Site, book_id: EntityId) -> (String, String) {
    match index.books.get(&book_id) {
        Some(book) => (book.name.clone(), hyperlink(&site.book_url(&book.slug))),
        None => (NO_BOOK.to_string(), NO_BOOK.to_string()),
    }
}

/// Display name + hyperlink cell for a page's parent chapter; the chapter URL
/// nests under the chapter's own parent book.
pub fn resolve_chapter(index: &RefIndex, site: &Site, chapter_id: EntityId) -> (String, String) {
    let Some(chapter) = index.chapters.get(&chapter_id) else {
        return (NO_CHAPTER.to_string(), NO_CHAPTER.to_string());
    };
    let link = match index.books.get(&chapter.book_id) {
        Some(book) => hyperlink(&site.chapter_url(&book.slug, &chapter.slug)),
        None => NO_BOOK.to_string(),
    };
    (chapter.name.clone(), link)
}

/// "`<shelf name>: <shelf URL>`" pairs for every shelf containing the book,
/// joined by ", "; a book on no shelf reads "No shelves found".
pub fn shelves_display(index: &RefIndex, site: &Site, book_id: EntityId) -> String {
    let Some(shelf_ids) = index.book_shelves.get(&book_id) else {
        return NO_SHELVES.to_string();
    };
    if shelf_ids.is_empty() {
        return NO_SHELVES.to_string();
    }
    let pairs: Vec<String> = shelf_ids
        .iter()
        .filter_map(|shelf_id| index.shelves.get(shelf_id))
        .map(|shelf| format!("{}: {}", shelf.name, site.shelf_url(&shelf.slug)))
        .collect();
    if pairs.is_empty() {
        return NO_SHELVES.to_string();
    }
    pairs.join(", ")
}

pub fn format_description(raw: &str) -> String {
    if raw.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        raw.to_string()
    }
}

pub fn format_tags(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return NO_TAGS.to_string();
    }
    tags.iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

#[cfg(test)]
mod tests {
    use super::{
        format_optional_timestamp, format_tags, format_timestamp, hyperlink, resolve_book,
        resolve_chapter, resolve_user_email, resolve_user_name, shelves_display,
    };
    use crate::config::Site;
    use crate::index::{BookRef, ChapterRef, RefIndex, ShelfRef};
    use crate::model::Tag;

    fn site() -> Site {
        Site::new("https://docs.example.com")
    }

    fn index_with_book() -> RefIndex {
        let mut index = RefIndex::default();
        index.books.insert(
            2,
            BookRef {
                slug: "handbook".to_string(),
                name: "Handbook".to_string(),
                owned_by: 1,
            },
        );
        index
    }

    #[test]
    fn wire_timestamp_becomes_display_timestamp() {
        assert_eq!(
            format_timestamp("2024-03-05T14:02:11.000000Z"),
            "2024-03-05 14:02:11"
        );
    }

    #[test]
    fn null_last_activity_becomes_unknown() {
        assert_eq!(format_optional_timestamp(None), "Unknown");
        assert_eq!(
            format_optional_timestamp(Some("2024-03-05T14:02:11.000000Z")),
            "2024-03-05 14:02:11"
        );
    }

    #[test]
    fn missing_owner_resolves_to_the_role_sentinel() {
        let index = RefIndex::default();
        assert_eq!(
            resolve_user_name(&index, 99, "Book Owner"),
            "Book Owner Unknown"
        );
        assert_eq!(
            resolve_user_email(&index, 99, "Page Creator"),
            "Page Creator Email Unknown"
        );
    }

    #[test]
    fn known_user_resolves_to_name_and_email() {
        let mut index = RefIndex::default();
        index.user_names.insert(1, "Ada".to_string());
        index.user_emails.insert(1, "ada@example.com".to_string());
        assert_eq!(resolve_user_name(&index, 1, "Page Owner"), "Ada");
        assert_eq!(resolve_user_email(&index, 1, "Page Owner"), "ada@example.com");
    }

    #[test]
    fn book_resolution_builds_a_hyperlink_cell() {
        let index = index_with_book();
        let (name, link) = resolve_book(&index, &site(), 2);
        assert_eq!(name, "Handbook");
        assert_eq!(
            link,
            "=HYPERLINK(\"https://docs.example.com/books/handbook\")"
        );
        let (name, link) = resolve_book(&index, &site(), 3);
        assert_eq!(name, "No Book");
        assert_eq!(link, "No Book");
    }

    #[test]
    fn chapter_links_nest_under_the_parent_book() {
        let mut index = index_with_book();
        index.chapters.insert(
            5,
            ChapterRef {
                slug: "intro".to_string(),
                name: "Intro".to_string(),
                owned_by: 1,
                book_id: 2,
            },
        );
        let (name, link) = resolve_chapter(&index, &site(), 5);
        assert_eq!(name, "Intro");
        assert_eq!(
            link,
            "=HYPERLINK(\"https://docs.example.com/books/handbook/chapter/intro\")"
        );
        assert_eq!(
            resolve_chapter(&index, &site(), 0),
            ("No Chapter".to_string(), "No Chapter".to_string())
        );
    }

    #[test]
    fn shelves_display_joins_name_url_pairs() {
        let mut index = index_with_book();
        index.shelves.insert(
            7,
            ShelfRef {
                slug: "it".to_string(),
                name: "IT".to_string(),
                owned_by: 1,
            },
        );
        index.book_shelves.insert(2, vec![7]);
        assert_eq!(
            shelves_display(&index, &site(), 2),
            "IT: https://docs.example.com/shelves/it"
        );
        assert_eq!(shelves_display(&index, &site(), 3), "No shelves found");
    }

    #[test]
    fn tags_join_or_fall_back() {
        let tags = vec![
            Tag {
                name: "howto".to_string(),
            },
            Tag {
                name: "internal".to_string(),
            },
        ];
        assert_eq!(format_tags(&tags), "howto, internal");
        assert_eq!(format_tags(&[]), "No Tag(s)");
    }

    #[test]
    fn hyperlink_cell_is_an_excel_formula() {
        assert_eq!(
            hyperlink("https://docs.example.com/shelves/it"),
            "=HYPERLINK(\"https://docs.example.com/shelves/it\")"
        );
    }
}
