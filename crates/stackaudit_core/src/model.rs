//! Wire models for the BookStack list and detail endpoints. Fields the
//! reports never read (template/priority/editor and friends) are not
//! modeled; serde skips them on deserialization.

use serde::Deserialize;

pub type EntityId = u64;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub profile_url: String,
    #[serde(default)]
    pub edit_url: String,
    #[serde(default)]
    pub avatar_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_activity_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Shelf {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub owned_by: EntityId,
    pub created_by: EntityId,
    pub updated_by: EntityId,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Book {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub owned_by: EntityId,
    pub created_by: EntityId,
    pub updated_by: EntityId,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chapter {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub book_id: EntityId,
    pub owned_by: EntityId,
    pub created_by: EntityId,
    pub updated_by: EntityId,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    pub book_id: EntityId,
    /// Absent or zero when the page sits directly under its book.
    #[serde(default)]
    pub chapter_id: EntityId,
    pub owned_by: EntityId,
    pub created_by: EntityId,
    pub updated_by: EntityId,
    #[serde(default)]
    pub draft: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub revision_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub extension: String,
    pub uploaded_to: EntityId,
    #[serde(default)]
    pub external: bool,
    pub created_by: EntityId,
    pub updated_by: EntityId,
    pub created_at: String,
    pub updated_at: String,
}

/// `shelves/{id}` detail payload; only the embedded book membership is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ShelfDetail {
    pub id: EntityId,
    #[serde(default)]
    pub books: Vec<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: EntityId,
}

/// `pages/{id}` detail payload; only the tag list is used.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PageDetail {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
}
