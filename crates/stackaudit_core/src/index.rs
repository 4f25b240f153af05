use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::client::ApiTransport;
use crate::fetch::{fetch_all_typed, fetch_detail};
use crate::model::{Book, Chapter, EntityId, Page, Shelf, ShelfDetail, User};
use crate::progress::{Phase, Progress};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfRef {
    pub slug: String,
    pub name: String,
    pub owned_by: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRef {
    pub slug: String,
    pub name: String,
    pub owned_by: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    pub slug: String,
    pub name: String,
    pub owned_by: EntityId,
    pub book_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub name: String,
    pub slug: String,
    pub book_id: EntityId,
}

/// The in-memory lookup tables built from one fetch snapshot. A pure value:
/// built fresh per run by [`build_index`], handed to every report function,
/// never partially updated.
#[derive(Debug, Clone, Default)]
pub struct RefIndex {
    pub user_names: HashMap<EntityId, String>,
    pub user_emails: HashMap<EntityId, String>,
    pub shelves: HashMap<EntityId, ShelfRef>,
    pub books: HashMap<EntityId, BookRef>,
    /// Inverse of each shelf's embedded book list; a book absent here is
    /// unshelved.
    pub book_shelves: HashMap<EntityId, Vec<EntityId>>,
    pub chapters: HashMap<EntityId, ChapterRef>,
    pub pages: HashMap<EntityId, PageRef>,
}

/// The setup step: one full fetch each of users, shelves, books, chapters and
/// pages, plus one detail fetch per shelf for book membership. Shelves are
/// walked before membership so every shelf id is already known.
pub fn build_index(transport: &impl ApiTransport, progress: &Progress) -> Result<RefIndex> {
    let mut index = RefIndex::default();

    let users: Vec<User> = fetch_all_typed(transport, "users").context("setup: users fetch")?;
    let mut tracker = progress.tracker(Phase::UsersIndex, users.len());
    for user in users {
        index.user_names.insert(user.id, user.name);
        index.user_emails.insert(user.id, user.email);
        tracker.tick();
    }

    let shelves: Vec<Shelf> =
        fetch_all_typed(transport, "shelves").context("setup: shelves fetch")?;
    let shelf_ids: Vec<EntityId> = shelves.iter().map(|shelf| shelf.id).collect();
    let mut tracker = progress.tracker(Phase::ShelvesIndex, shelves.len());
    for shelf in shelves {
        index.shelves.insert(
            shelf.id,
            ShelfRef {
                slug: shelf.slug,
                name: shelf.name,
                owned_by: shelf.owned_by,
            },
        );
        tracker.tick();
    }

    let mut tracker = progress.tracker(Phase::Membership, shelf_ids.len());
    for shelf_id in shelf_ids {
        let detail: ShelfDetail = fetch_detail(transport, &format!("shelves/{shelf_id}"))
            .context("setup: shelf membership fetch")?;
        for book in detail.books {
            index.book_shelves.entry(book.id).or_default().push(shelf_id);
        }
        tracker.tick();
    }

    let books: Vec<Book> = fetch_all_typed(transport, "books").context("setup: books fetch")?;
    let mut tracker = progress.tracker(Phase::BooksIndex, books.len());
    for book in books {
        index.books.insert(
            book.id,
            BookRef {
                slug: book.slug,
                name: book.name,
                owned_by: book.owned_by,
            },
        );
        tracker.tick();
    }

    let chapters: Vec<Chapter> =
        fetch_all_typed(transport, "chapters").context("setup: chapters fetch")?;
    let mut tracker = progress.tracker(Phase::ChaptersIndex, chapters.len());
    for chapter in chapters {
        index.chapters.insert(
            chapter.id,
            ChapterRef {
                slug: chapter.slug,
                name: chapter.name,
                owned_by: chapter.owned_by,
                book_id: chapter.book_id,
            },
        );
        tracker.tick();
    }

    let pages: Vec<Page> = fetch_all_typed(transport, "pages").context("setup: pages fetch")?;
    let mut tracker = progress.tracker(Phase::PagesIndex, pages.len());
    for page in pages {
        index.pages.insert(
            page.id,
            PageRef {
                name: page.name,
                slug: page.slug,
                book_id: page.book_id,
            },
        );
        tracker.tick();
    }

    log::info!(
        "reference index ready: {} users, {} shelves, {} books, {} chapters, {} pages",
        index.user_names.len(),
        index.shelves.len(),
        index.books.len(),
        index.chapters.len(),
        index.pages.len()
    );
    Ok(index)
}
