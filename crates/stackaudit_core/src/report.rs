//! The nine report assemblies. Every report performs its own full fetch of
//! its base entity type, enriches each record through the reference index,
//! and projects the result through its column spec. Derived views (duplicate
//! and set-difference) filter the enriched record set before projection.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::client::ApiTransport;
use crate::config::Site;
use crate::enrich::{
    NO_PAGE, NO_TAGS, format_description, format_optional_timestamp, format_tags,
    format_timestamp, hyperlink, resolve_book, resolve_chapter, resolve_user_email,
    resolve_user_email_opt, resolve_user_name, resolve_user_name_opt, shelves_display, yes_no,
};
use crate::fetch::{fetch_all_typed, fetch_detail};
use crate::index::RefIndex;
use crate::model::{Attachment, Book, Chapter, EntityId, Page, PageDetail, Shelf, ShelfDetail, User};
use crate::progress::{Phase, Progress};
use crate::table::{ColumnSpec, Record, Table, keep_duplicates_by, project};
use crate::workbook::write_workbook;

pub const PAGES_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "slug",
        "page_owner",
        "page_owner_email",
        "page_creator",
        "page_creator_email",
        "page_updater",
        "page_updater_email",
        "draft",
        "created_at",
        "updated_at",
        "tags",
        "chapter_name",
        "chapter_slug",
        "chapter_owner",
        "chapter_owner_email",
        "book_name",
        "book_slug",
        "book_owner",
        "book_owner_email",
        "shelves",
    ],
    rename: &[
        ("name", "Page Name"),
        ("slug", "Page URL"),
        ("page_owner", "Page Owner"),
        ("page_owner_email", "Page Owner Email"),
        ("page_creator", "Page Creator"),
        ("page_creator_email", "Page Creator Email"),
        ("page_updater", "Page Updater"),
        ("page_updater_email", "Page Updater Email"),
        ("draft", "Draft Status"),
        ("created_at", "Created At"),
        ("updated_at", "Updated At"),
        ("tags", "Tags"),
        ("chapter_name", "Chapter Name"),
        ("chapter_slug", "Chapter URL"),
        ("chapter_owner", "Chapter Owner"),
        ("chapter_owner_email", "Chapter Owner Email"),
        ("book_name", "Book Name"),
        ("book_slug", "Book URL"),
        ("book_owner", "Book Owner"),
        ("book_owner_email", "Book Owner Email"),
        ("shelves", "Shelves"),
    ],
};

pub const ATTACHMENTS_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "extension",
        "page_name",
        "uploaded_to",
        "external",
        "creator",
        "creator_email",
        "created_at",
        "updater",
        "updater_email",
        "updated_at",
    ],
    rename: &[
        ("name", "Attachment Name"),
        ("extension", "Extension Type"),
        ("page_name", "Page Name"),
        ("uploaded_to", "Page URL"),
        ("external", "Is The Attachment A Link?"),
        ("creator", "Creator"),
        ("creator_email", "Creator Email"),
        ("created_at", "Created At"),
        ("updater", "Updater"),
        ("updater_email", "Updater Email"),
        ("updated_at", "Updated At"),
    ],
};

pub const BOOKS_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "slug",
        "description",
        "owner",
        "owner_email",
        "creator",
        "creator_email",
        "created_at",
        "updater",
        "updater_email",
        "updated_at",
        "shelves",
    ],
    rename: &[
        ("name", "Book Name"),
        ("slug", "Book URL"),
        ("description", "Description"),
        ("owner", "Owner"),
        ("owner_email", "Owner Email"),
        ("creator", "Creator"),
        ("creator_email", "Creator Email"),
        ("created_at", "Created At"),
        ("updater", "Updater"),
        ("updater_email", "Updater Email"),
        ("updated_at", "Updated At"),
        ("shelves", "Shelves"),
    ],
};

/// Books columns without the Shelves column: every row here has no shelf.
pub const UNSHELVED_BOOKS_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "slug",
        "description",
        "owner",
        "owner_email",
        "creator",
        "creator_email",
        "created_at",
        "updater",
        "updater_email",
        "updated_at",
    ],
    rename: BOOKS_SPEC.rename,
};

pub const CHAPTERS_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "slug",
        "description",
        "owner",
        "owner_email",
        "creator",
        "creator_email",
        "created_at",
        "updater",
        "updater_email",
        "updated_at",
        "book_name",
        "book_slug",
    ],
    rename: &[
        ("name", "Chapter Name"),
        ("slug", "Chapter URL"),
        ("description", "Description"),
        ("owner", "Owner"),
        ("owner_email", "Owner Email"),
        ("creator", "Creator"),
        ("creator_email", "Creator Email"),
        ("created_at", "Created At"),
        ("updater", "Updater"),
        ("updater_email", "Updater Email"),
        ("updated_at", "Updated At"),
        ("book_name", "Book Name"),
        ("book_slug", "Book URL"),
    ],
};

pub const SHELVES_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "slug",
        "description",
        "owner",
        "owner_email",
        "creator",
        "creator_email",
        "created_at",
        "updater",
        "updater_email",
        "updated_at",
    ],
    rename: &[
        ("name", "Shelf Name"),
        ("slug", "Shelf URL"),
        ("description", "Description"),
        ("owner", "Owner"),
        ("owner_email", "Owner Email"),
        ("creator", "Creator"),
        ("creator_email", "Creator Email"),
        ("created_at", "Created At"),
        ("updater", "Updater"),
        ("updater_email", "Updater Email"),
        ("updated_at", "Updated At"),
    ],
};

pub const USERS_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "email",
        "created_at",
        "updated_at",
        "last_activity_at",
        "profile_url",
        "edit_url",
        "avatar_url",
    ],
    rename: &[
        ("name", "Name"),
        ("email", "User Email"),
        ("created_at", "Created At"),
        ("updated_at", "Updated At"),
        ("last_activity_at", "Last Activity At"),
        ("profile_url", "Profile URL"),
        ("edit_url", "Edit URL"),
        ("avatar_url", "Avatar URL"),
    ],
};

pub const DUPLICATE_PAGES_SPEC: ColumnSpec = ColumnSpec {
    order: &[
        "name",
        "slug",
        "owner",
        "owner_email",
        "creator",
        "creator_email",
        "created_at",
        "updater",
        "updater_email",
        "updated_at",
        "revision_count",
        "book_name",
        "book_slug",
    ],
    rename: &[
        ("name", "Page Name"),
        ("slug", "Page URL"),
        ("owner", "Owner"),
        ("owner_email", "Owner Email"),
        ("creator", "Creator"),
        ("creator_email", "Creator Email"),
        ("created_at", "Created At"),
        ("updater", "Updater"),
        ("updater_email", "Updater Email"),
        ("updated_at", "Updated At"),
        ("revision_count", "Revision Count"),
        ("book_name", "Book Name"),
        ("book_slug", "Book URL"),
    ],
};

/// All nine tables of one report run, ready for the workbook writer.
pub struct ReportSet {
    pub pages: Table,
    pub attachments: Table,
    pub books: Table,
    pub duplicate_books: Table,
    pub unshelved_books: Table,
    pub chapters: Table,
    pub duplicate_pages: Table,
    pub shelves: Table,
    pub users: Table,
}

impl ReportSet {
    /// Sheet name / table pairs in the fixed workbook order.
    pub fn sheets(&self) -> Vec<(&'static str, &Table)> {
        vec![
            ("Pages", &self.pages),
            ("Attachments", &self.attachments),
            ("Chapters", &self.chapters),
            ("Books", &self.books),
            ("Shelves", &self.shelves),
            ("Users", &self.users),
            ("Duplicate Books", &self.duplicate_books),
            ("Unshelved Books", &self.unshelved_books),
            ("Duplicate Pages", &self.duplicate_pages),
        ]
    }
}

/// Run-scoped report context: one transport, one ready index, one progress
/// sink. Holding the index by reference makes the setup-before-reports
/// ordering a type-level requirement rather than a hidden convention.
pub struct Reporter<'a, C: ApiTransport> {
    transport: &'a C,
    index: &'a RefIndex,
    site: &'a Site,
    progress: &'a Progress,
    refetch_membership: bool,
}

impl<'a, C: ApiTransport> Reporter<'a, C> {
    pub fn new(
        transport: &'a C,
        index: &'a RefIndex,
        site: &'a Site,
        progress: &'a Progress,
    ) -> Self {
        Self {
            transport,
            index,
            site,
            progress,
            refetch_membership: true,
        }
    }

    /// Whether the unshelved-books report refetches shelf membership instead
    /// of reusing the index built during setup.
    pub fn refetch_membership(mut self, refetch: bool) -> Self {
        self.refetch_membership = refetch;
        self
    }

    /// Build all nine tables and write the workbook in one pass. Any aborted
    /// report leaves no output file behind; a completed run clears the
    /// progress readout.
    pub fn run_reports(&self, destination: &Path) -> Result<PathBuf> {
        let set = self.build_report_set()?;
        write_workbook(&set.sheets(), destination)?;
        self.progress.clear();
        Ok(destination.to_path_buf())
    }

    pub fn build_report_set(&self) -> Result<ReportSet> {
        Ok(ReportSet {
            pages: self.pages_report()?,
            attachments: self.attachments_report()?,
            books: self.books_report()?,
            duplicate_books: self.duplicate_books_report()?,
            unshelved_books: self.unshelved_books_report()?,
            chapters: self.chapters_report()?,
            duplicate_pages: self.duplicate_pages_report()?,
            shelves: self.shelves_report()?,
            users: self.users_report()?,
        })
    }

    pub fn pages_report(&self) -> Result<Table> {
        let pages: Vec<Page> =
            fetch_all_typed(self.transport, "pages").context("pages report: pages fetch")?;
        if pages.is_empty() {
            bail!("pages report: pages fetch returned no records");
        }

        // One detail request per page for its tag list. A failed lookup
        // degrades to the no-tags value rather than aborting the report.
        let mut tags: HashMap<EntityId, String> = HashMap::new();
        let mut tracker = self.progress.tracker(Phase::PageTags, pages.len());
        for page in &pages {
            let detail = match fetch_detail::<PageDetail>(
                self.transport,
                &format!("pages/{}", page.id),
            ) {
                Ok(detail) => detail,
                Err(error) => {
                    log::warn!("pages report: tag lookup for page {} failed: {error:#}", page.id);
                    PageDetail::default()
                }
            };
            tags.insert(page.id, format_tags(&detail.tags));
            tracker.tick();
        }

        let mut tracker = self.progress.tracker(Phase::PagesReport, pages.len());
        let records: Vec<Record> = pages
            .iter()
            .map(|page| {
                let record = self.enrich_page_full(page, &tags);
                tracker.tick();
                record
            })
            .collect();
        Ok(project(&records, &PAGES_SPEC))
    }

    pub fn attachments_report(&self) -> Result<Table> {
        let attachments: Vec<Attachment> = fetch_all_typed(self.transport, "attachments")
            .context("attachments report: attachments fetch")?;
        if attachments.is_empty() {
            bail!("attachments report: attachments fetch returned no records");
        }
        let mut tracker = self
            .progress
            .tracker(Phase::AttachmentsReport, attachments.len());
        let records: Vec<Record> = attachments
            .iter()
            .map(|attachment| {
                let record = self.enrich_attachment(attachment);
                tracker.tick();
                record
            })
            .collect();
        Ok(project(&records, &ATTACHMENTS_SPEC))
    }

    pub fn books_report(&self) -> Result<Table> {
        let books: Vec<Book> =
            fetch_all_typed(self.transport, "books").context("books report: books fetch")?;
        if books.is_empty() {
            bail!("books report: books fetch returned no records");
        }
        let mut tracker = self.progress.tracker(Phase::BooksReport, books.len());
        let records: Vec<Record> = books
            .iter()
            .map(|book| {
                let record = self.enrich_book(book);
                tracker.tick();
                record
            })
            .collect();
        Ok(project(&records, &BOOKS_SPEC))
    }

    /// Books whose display name is shared by at least two books, all
    /// occurrences kept, sorted by name. A failed or empty initial books
    /// fetch yields an empty sheet rather than aborting the run.
    pub fn duplicate_books_report(&self) -> Result<Table> {
        let books: Vec<Book> = match fetch_all_typed(self.transport, "books") {
            Ok(books) => books,
            Err(error) => {
                log::warn!("duplicate books report: books fetch failed: {error:#}");
                return Ok(Table::empty(&BOOKS_SPEC));
            }
        };
        let mut tracker = self
            .progress
            .tracker(Phase::DuplicateBooksReport, books.len());
        let records: Vec<Record> = books
            .iter()
            .map(|book| {
                let record = self.enrich_book(book);
                tracker.tick();
                record
            })
            .collect();
        let duplicates = keep_duplicates_by(records, "name");
        Ok(project(&duplicates, &BOOKS_SPEC))
    }

    /// Set-difference view: the full books table minus every book appearing
    /// in any shelf's membership list. Membership is refetched per run unless
    /// the reporter was configured to reuse the setup index.
    pub fn unshelved_books_report(&self) -> Result<Table> {
        let books: Vec<Book> = match fetch_all_typed(self.transport, "books") {
            Ok(books) => books,
            Err(error) => {
                log::warn!("unshelved books report: books fetch failed: {error:#}");
                return Ok(Table::empty(&UNSHELVED_BOOKS_SPEC));
            }
        };

        let shelved = if self.refetch_membership {
            self.fetch_shelved_book_ids()?
        } else {
            self.progress.tracker(Phase::UnshelvedBooksReport, 0);
            self.index.book_shelves.keys().copied().collect()
        };

        let unshelved: Vec<&Book> = books.iter().filter(|book| !shelved.contains(&book.id)).collect();
        let records: Vec<Record> = unshelved.iter().map(|book| self.enrich_book(book)).collect();
        Ok(project(&records, &UNSHELVED_BOOKS_SPEC))
    }

    /// The membership walk dominates this report's runtime (one detail
    /// request per shelf), so it drives the phase readout.
    fn fetch_shelved_book_ids(&self) -> Result<HashSet<EntityId>> {
        let shelves: Vec<Shelf> = fetch_all_typed(self.transport, "shelves")
            .context("unshelved books report: shelves fetch")?;
        let mut shelved = HashSet::new();
        let mut tracker = self
            .progress
            .tracker(Phase::UnshelvedBooksReport, shelves.len());
        for shelf in shelves {
            let detail: ShelfDetail =
                fetch_detail(self.transport, &format!("shelves/{}", shelf.id))
                    .context("unshelved books report: shelf membership fetch")?;
            shelved.extend(detail.books.iter().map(|book| book.id));
            tracker.tick();
        }
        Ok(shelved)
    }

    pub fn chapters_report(&self) -> Result<Table> {
        let chapters: Vec<Chapter> = fetch_all_typed(self.transport, "chapters")
            .context("chapters report: chapters fetch")?;
        if chapters.is_empty() {
            bail!("chapters report: chapters fetch returned no records");
        }
        let mut tracker = self.progress.tracker(Phase::ChaptersReport, chapters.len());
        let records: Vec<Record> = chapters
            .iter()
            .map(|chapter| {
                let record = self.enrich_chapter(chapter);
                tracker.tick();
                record
            })
            .collect();
        Ok(project(&records, &CHAPTERS_SPEC))
    }

    pub fn duplicate_pages_report(&self) -> Result<Table> {
        let pages: Vec<Page> = fetch_all_typed(self.transport, "pages")
            .context("duplicate pages report: pages fetch")?;
        if pages.is_empty() {
            bail!("duplicate pages report: pages fetch returned no records");
        }
        let mut tracker = self
            .progress
            .tracker(Phase::DuplicatePagesReport, pages.len());
        let records: Vec<Record> = pages
            .iter()
            .map(|page| {
                let record = self.enrich_page_brief(page);
                tracker.tick();
                record
            })
            .collect();
        let duplicates = keep_duplicates_by(records, "name");
        Ok(project(&duplicates, &DUPLICATE_PAGES_SPEC))
    }

    pub fn shelves_report(&self) -> Result<Table> {
        let shelves: Vec<Shelf> =
            fetch_all_typed(self.transport, "shelves").context("shelves report: shelves fetch")?;
        if shelves.is_empty() {
            bail!("shelves report: shelves fetch returned no records");
        }
        let mut tracker = self.progress.tracker(Phase::ShelvesReport, shelves.len());
        let records: Vec<Record> = shelves
            .iter()
            .map(|shelf| {
                let record = self.enrich_shelf(shelf);
                tracker.tick();
                record
            })
            .collect();
        Ok(project(&records, &SHELVES_SPEC))
    }

    pub fn users_report(&self) -> Result<Table> {
        let users: Vec<User> =
            fetch_all_typed(self.transport, "users").context("users report: users fetch")?;
        if users.is_empty() {
            bail!("users report: users fetch returned no records");
        }
        let mut tracker = self.progress.tracker(Phase::UsersReport, users.len());
        let records: Vec<Record> = users
            .iter()
            .map(|user| {
                let record = enrich_user(user);
                tracker.tick();
                record
            })
            .collect();
        Ok(project(&records, &USERS_SPEC))
    }

    fn actor_fields(
        &self,
        record: &mut Record,
        entity: &str,
        owned_by: EntityId,
        created_by: EntityId,
        updated_by: EntityId,
    ) {
        let index = self.index;
        record.insert(
            "owner",
            resolve_user_name(index, owned_by, &format!("{entity} Owner")),
        );
        record.insert(
            "owner_email",
            resolve_user_email(index, owned_by, &format!("{entity} Owner")),
        );
        record.insert(
            "creator",
            resolve_user_name(index, created_by, &format!("{entity} Creator")),
        );
        record.insert(
            "creator_email",
            resolve_user_email(index, created_by, &format!("{entity} Creator")),
        );
        record.insert(
            "updater",
            resolve_user_name(index, updated_by, &format!("{entity} Updater")),
        );
        record.insert(
            "updater_email",
            resolve_user_email(index, updated_by, &format!("{entity} Updater")),
        );
    }

    fn enrich_book(&self, book: &Book) -> Record {
        let mut record = Record::new();
        record.insert("name", book.name.clone());
        record.insert("slug", hyperlink(&self.site.book_url(&book.slug)));
        record.insert("description", format_description(&book.description));
        self.actor_fields(&mut record, "Book", book.owned_by, book.created_by, book.updated_by);
        record.insert("created_at", format_timestamp(&book.created_at));
        record.insert("updated_at", format_timestamp(&book.updated_at));
        record.insert("shelves", shelves_display(self.index, self.site, book.id));
        record
    }

    fn enrich_shelf(&self, shelf: &Shelf) -> Record {
        let mut record = Record::new();
        record.insert("name", shelf.name.clone());
        record.insert("slug", hyperlink(&self.site.shelf_url(&shelf.slug)));
        record.insert("description", format_description(&shelf.description));
        self.actor_fields(
            &mut record,
            "Shelf",
            shelf.owned_by,
            shelf.created_by,
            shelf.updated_by,
        );
        record.insert("created_at", format_timestamp(&shelf.created_at));
        record.insert("updated_at", format_timestamp(&shelf.updated_at));
        record
    }

    fn enrich_chapter(&self, chapter: &Chapter) -> Record {
        let mut record = Record::new();
        record.insert("name", chapter.name.clone());
        let (book_name, book_link) = resolve_book(self.index, self.site, chapter.book_id);
        record.insert(
            "slug",
            match self.index.books.get(&chapter.book_id) {
                Some(book) => hyperlink(&self.site.chapter_url(&book.slug, &chapter.slug)),
                None => book_link.clone(),
            },
        );
        record.insert("description", format_description(&chapter.description));
        self.actor_fields(
            &mut record,
            "Chapter",
            chapter.owned_by,
            chapter.created_by,
            chapter.updated_by,
        );
        record.insert("created_at", format_timestamp(&chapter.created_at));
        record.insert("updated_at", format_timestamp(&chapter.updated_at));
        record.insert("book_name", book_name);
        record.insert("book_slug", book_link);
        record
    }

    fn enrich_attachment(&self, attachment: &Attachment) -> Record {
        let mut record = Record::new();
        record.insert("name", attachment.name.clone());
        record.insert("extension", attachment.extension.clone());
        match self.index.pages.get(&attachment.uploaded_to) {
            Some(page) => {
                record.insert("page_name", page.name.clone());
                record.insert(
                    "uploaded_to",
                    match self.index.books.get(&page.book_id) {
                        Some(book) => hyperlink(&self.site.page_url(&book.slug, &page.slug)),
                        None => NO_PAGE.to_string(),
                    },
                );
            }
            None => {
                record.insert("page_name", NO_PAGE.to_string());
                record.insert("uploaded_to", NO_PAGE.to_string());
            }
        }
        record.insert("external", yes_no(attachment.external).to_string());
        let index = self.index;
        record.insert(
            "creator",
            resolve_user_name(index, attachment.created_by, "Attachment Creator"),
        );
        record.insert(
            "creator_email",
            resolve_user_email(index, attachment.created_by, "Attachment Creator"),
        );
        record.insert(
            "updater",
            resolve_user_name(index, attachment.updated_by, "Attachment Updater"),
        );
        record.insert(
            "updater_email",
            resolve_user_email(index, attachment.updated_by, "Attachment Updater"),
        );
        record.insert("created_at", format_timestamp(&attachment.created_at));
        record.insert("updated_at", format_timestamp(&attachment.updated_at));
        record
    }

    /// The pages sheet: full enrichment including parent chapter/book owner
    /// columns and the per-book shelves display.
    fn enrich_page_full(&self, page: &Page, tags: &HashMap<EntityId, String>) -> Record {
        let index = self.index;
        let mut record = Record::new();
        record.insert("name", page.name.clone());
        record.insert("slug", self.page_link(page));
        record.insert(
            "page_owner",
            resolve_user_name(index, page.owned_by, "Page Owner"),
        );
        record.insert(
            "page_owner_email",
            resolve_user_email(index, page.owned_by, "Page Owner"),
        );
        record.insert(
            "page_creator",
            resolve_user_name(index, page.created_by, "Page Creator"),
        );
        record.insert(
            "page_creator_email",
            resolve_user_email(index, page.created_by, "Page Creator"),
        );
        record.insert(
            "page_updater",
            resolve_user_name(index, page.updated_by, "Page Updater"),
        );
        record.insert(
            "page_updater_email",
            resolve_user_email(index, page.updated_by, "Page Updater"),
        );
        record.insert("draft", page.draft.to_string());
        record.insert("created_at", format_timestamp(&page.created_at));
        record.insert("updated_at", format_timestamp(&page.updated_at));
        record.insert(
            "tags",
            tags.get(&page.id).cloned().unwrap_or_else(|| NO_TAGS.to_string()),
        );

        let (chapter_name, chapter_link) = resolve_chapter(index, self.site, page.chapter_id);
        record.insert("chapter_name", chapter_name);
        record.insert("chapter_slug", chapter_link);
        let chapter_owner = index.chapters.get(&page.chapter_id).map(|c| c.owned_by);
        record.insert(
            "chapter_owner",
            resolve_user_name_opt(index, chapter_owner, "Chapter Owner"),
        );
        record.insert(
            "chapter_owner_email",
            resolve_user_email_opt(index, chapter_owner, "Chapter Owner"),
        );

        let (book_name, book_link) = resolve_book(index, self.site, page.book_id);
        record.insert("book_name", book_name);
        record.insert("book_slug", book_link);
        let book_owner = index.books.get(&page.book_id).map(|b| b.owned_by);
        record.insert(
            "book_owner",
            resolve_user_name_opt(index, book_owner, "Book Owner"),
        );
        record.insert(
            "book_owner_email",
            resolve_user_email_opt(index, book_owner, "Book Owner"),
        );

        record.insert("shelves", shelves_display(index, self.site, page.book_id));
        record
    }

    /// The duplicate-pages sheet: the condensed page row without tag,
    /// chapter, or shelf columns.
    fn enrich_page_brief(&self, page: &Page) -> Record {
        let mut record = Record::new();
        record.insert("name", page.name.clone());
        record.insert("slug", self.page_link(page));
        self.actor_fields(&mut record, "Page", page.owned_by, page.created_by, page.updated_by);
        record.insert("created_at", format_timestamp(&page.created_at));
        record.insert("updated_at", format_timestamp(&page.updated_at));
        record.insert("revision_count", page.revision_count.to_string());
        let (book_name, book_link) = resolve_book(self.index, self.site, page.book_id);
        record.insert("book_name", book_name);
        record.insert("book_slug", book_link);
        record
    }

    fn page_link(&self, page: &Page) -> String {
        match self.index.books.get(&page.book_id) {
            Some(book) => hyperlink(&self.site.page_url(&book.slug, &page.slug)),
            None => crate::enrich::NO_BOOK.to_string(),
        }
    }
}

fn enrich_user(user: &User) -> Record {
    let mut record = Record::new();
    record.insert("name", user.name.clone());
    record.insert("email", user.email.clone());
    record.insert("created_at", format_timestamp(&user.created_at));
    record.insert("updated_at", format_timestamp(&user.updated_at));
    record.insert(
        "last_activity_at",
        format_optional_timestamp(user.last_activity_at.as_deref()),
    );
    record.insert("profile_url", hyperlink(&user.profile_url));
    record.insert("edit_url", hyperlink(&user.edit_url));
    record.insert("avatar_url", hyperlink(&user.avatar_url));
    record
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::{Result, bail};
    use serde_json::{Value, json};

    use super::Reporter;
    use crate::client::ApiTransport;
    use crate::config::Site;
    use crate::index::build_index;
    use crate::progress::Progress;

    /// In-memory API: canned list endpoints plus detail lookups, with an
    /// optional set of endpoints that fail outright.
    struct FakeApi {
        lists: HashMap<&'static str, Vec<Value>>,
        details: HashMap<String, Value>,
        failing: Vec<&'static str>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                lists: HashMap::new(),
                details: HashMap::new(),
                failing: Vec::new(),
            }
        }

        fn list(mut self, endpoint: &'static str, records: Vec<Value>) -> Self {
            self.lists.insert(endpoint, records);
            self
        }

        fn detail(mut self, endpoint: &str, body: Value) -> Self {
            self.details.insert(endpoint.to_string(), body);
            self
        }

        fn failing(mut self, endpoint: &'static str) -> Self {
            self.failing.push(endpoint);
            self
        }
    }

    impl ApiTransport for FakeApi {
        fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
            if self.failing.contains(&endpoint) {
                bail!("{endpoint}: HTTP 500: server error");
            }
            if let Some(records) = self.lists.get(endpoint) {
                let count = query
                    .iter()
                    .find(|(key, _)| *key == "count")
                    .and_then(|(_, value)| value.parse::<usize>().ok())
                    .unwrap_or(records.len());
                let page: Vec<Value> = records.iter().take(count).cloned().collect();
                return Ok(json!({"data": page, "total": records.len()}));
            }
            match self.details.get(endpoint) {
                Some(body) => Ok(body.clone()),
                None => bail!("{endpoint}: HTTP 404: not found"),
            }
        }
    }

    fn entity(id: u64, name: &str, slug: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "slug": slug,
            "description": "",
            "owned_by": 1,
            "created_by": 1,
            "updated_by": 1,
            "created_at": "2024-03-05T14:02:11.000000Z",
            "updated_at": "2024-03-06T09:30:00.000000Z"
        })
    }

    fn book(id: u64, name: &str, slug: &str) -> Value {
        entity(id, name, slug)
    }

    /// 1 user, 1 shelf holding books 1 and 2, 3 books, 1 chapter in book 1,
    /// 2 pages (one in the chapter, one bare in book 2).
    fn library() -> FakeApi {
        let mut page_a = entity(40, "Setup", "setup");
        page_a["book_id"] = json!(1);
        page_a["chapter_id"] = json!(10);
        page_a["draft"] = json!(false);
        page_a["revision_count"] = json!(3);
        let mut page_b = entity(41, "Setup", "setup-2");
        page_b["book_id"] = json!(2);
        page_b["revision_count"] = json!(1);
        let mut chapter = entity(10, "Intro", "intro");
        chapter["book_id"] = json!(1);

        FakeApi::new()
            .list(
                "users",
                vec![json!({
                    "id": 1,
                    "name": "Ada",
                    "email": "ada@example.com",
                    "created_at": "2024-01-01T00:00:00.000000Z",
                    "updated_at": "2024-01-02T00:00:00.000000Z",
                    "last_activity_at": null,
                    "profile_url": "https://docs.example.com/user/ada",
                    "edit_url": "https://docs.example.com/settings/users/1",
                    "avatar_url": "https://docs.example.com/avatar/1"
                })],
            )
            .list("shelves", vec![entity(7, "IT", "it")])
            .detail("shelves/7", json!({"id": 7, "books": [{"id": 1}, {"id": 2}]}))
            .list(
                "books",
                vec![
                    book(1, "Handbook", "handbook"),
                    book(2, "Handbook", "handbook-2"),
                    book(3, "Scratch", "scratch"),
                ],
            )
            .list("chapters", vec![chapter])
            .list("pages", vec![page_a, page_b])
            .detail("pages/40", json!({"tags": [{"name": "howto"}]}))
            .detail("pages/41", json!({"tags": []}))
            .list(
                "attachments",
                vec![json!({
                    "id": 90,
                    "name": "diagram",
                    "extension": "png",
                    "uploaded_to": 40,
                    "external": false,
                    "created_by": 1,
                    "updated_by": 1,
                    "created_at": "2024-03-05T14:02:11.000000Z",
                    "updated_at": "2024-03-05T14:02:11.000000Z"
                })],
            )
    }

    fn with_reporter<T>(api: &FakeApi, check: impl FnOnce(&Reporter<'_, FakeApi>) -> T) -> T {
        let site = Site::new("https://docs.example.com");
        let progress = Progress::new();
        let index = build_index(api, &progress).expect("index");
        let reporter = Reporter::new(api, &index, &site, &progress);
        check(&reporter)
    }

    #[test]
    fn pages_report_enriches_parents_and_tags() {
        let api = library();
        with_reporter(&api, |reporter| {
            let table = reporter.pages_report().expect("pages report");
            assert_eq!(table.columns.len(), 21);
            let column = |name| table.column_index(name).expect("column");
            let row = &table.rows[0];
            assert_eq!(row[column("Page Name")], "Setup");
            assert_eq!(
                row[column("Page URL")],
                "=HYPERLINK(\"https://docs.example.com/books/handbook/page/setup\")"
            );
            assert_eq!(row[column("Page Owner")], "Ada");
            assert_eq!(row[column("Tags")], "howto");
            assert_eq!(row[column("Chapter Name")], "Intro");
            assert_eq!(row[column("Chapter Owner")], "Ada");
            assert_eq!(row[column("Book Name")], "Handbook");
            assert_eq!(
                row[column("Shelves")],
                "IT: https://docs.example.com/shelves/it"
            );
            assert_eq!(row[column("Created At")], "2024-03-05 14:02:11");

            // The bare page sits directly under its book.
            let bare = &table.rows[1];
            assert_eq!(bare[column("Chapter Name")], "No Chapter");
            assert_eq!(bare[column("Chapter Owner")], "Chapter Owner Unknown");
        });
    }

    #[test]
    fn failed_tag_lookup_degrades_to_no_tags() {
        let mut api = library();
        api.details.remove("pages/40");
        with_reporter(&api, |reporter| {
            let table = reporter.pages_report().expect("pages report");
            let column = table.column_index("Tags").expect("column");
            assert_eq!(table.rows[0][column], "No Tag(s)");
        });
    }

    #[test]
    fn attachments_report_links_back_to_the_page() {
        let api = library();
        with_reporter(&api, |reporter| {
            let table = reporter.attachments_report().expect("attachments report");
            let column = |name| table.column_index(name).expect("column");
            let row = &table.rows[0];
            assert_eq!(row[column("Attachment Name")], "diagram");
            assert_eq!(row[column("Extension Type")], "png");
            assert_eq!(row[column("Page Name")], "Setup");
            assert_eq!(
                row[column("Page URL")],
                "=HYPERLINK(\"https://docs.example.com/books/handbook/page/setup\")"
            );
            assert_eq!(row[column("Is The Attachment A Link?")], "No");
            assert_eq!(row[column("Creator")], "Ada");
            assert_eq!(row[column("Updater")], "Ada");
            // The attachment sheet carries no owner columns.
            assert!(table.column_index("Owner").is_none());
        });
    }

    #[test]
    fn unknown_attachment_actors_resolve_to_attachment_sentinels() {
        let mut api = library();
        let attachment = &mut api.lists.get_mut("attachments").unwrap()[0];
        attachment["created_by"] = json!(99);
        attachment["updated_by"] = json!(99);
        with_reporter(&api, |reporter| {
            let table = reporter.attachments_report().expect("attachments report");
            let column = |name| table.column_index(name).expect("column");
            let row = &table.rows[0];
            assert_eq!(row[column("Creator")], "Attachment Creator Unknown");
            assert_eq!(
                row[column("Creator Email")],
                "Attachment Creator Email Unknown"
            );
            assert_eq!(row[column("Updater")], "Attachment Updater Unknown");
        });
    }

    #[test]
    fn duplicate_books_keeps_both_handbooks() {
        let api = library();
        with_reporter(&api, |reporter| {
            let table = reporter.duplicate_books_report().expect("duplicate books");
            let column = table.column_index("Book Name").expect("column");
            let names: Vec<&str> = table.rows.iter().map(|row| row[column].as_str()).collect();
            assert_eq!(names, vec!["Handbook", "Handbook"]);
        });
    }

    #[test]
    fn duplicate_books_fetch_failure_yields_an_empty_sheet() {
        let api = library().failing("books");
        let site = Site::new("https://docs.example.com");
        let progress = Progress::new();
        // Index setup also needs books; build it from a healthy API first.
        let index = build_index(&library(), &progress).expect("index");
        let reporter = Reporter::new(&api, &index, &site, &progress);
        let table = reporter.duplicate_books_report().expect("duplicate books");
        assert!(table.rows.is_empty());
        assert_eq!(table.columns.len(), 12);
    }

    #[test]
    fn unshelved_books_is_the_set_difference() {
        let api = library();
        with_reporter(&api, |reporter| {
            let table = reporter.unshelved_books_report().expect("unshelved books");
            let column = table.column_index("Book Name").expect("column");
            let names: Vec<&str> = table.rows.iter().map(|row| row[column].as_str()).collect();
            assert_eq!(names, vec!["Scratch"]);
            // No shelves column on this sheet.
            assert!(table.column_index("Shelves").is_none());
        });
    }

    #[test]
    fn unshelved_books_can_reuse_the_setup_index() {
        let api = library();
        let site = Site::new("https://docs.example.com");
        let progress = Progress::new();
        let index = build_index(&api, &progress).expect("index");
        // Membership no longer fetchable: the cached index must suffice.
        let mut api = library();
        api.details.remove("shelves/7");
        let reporter = Reporter::new(&api, &index, &site, &progress).refetch_membership(false);
        let table = reporter.unshelved_books_report().expect("unshelved books");
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn unshelved_membership_walk_completes_its_phase() {
        let api = library();
        let site = Site::new("https://docs.example.com");
        let progress = Progress::new();
        let index = build_index(&api, &progress).expect("index");
        let reporter = Reporter::new(&api, &index, &site, &progress);
        reporter.unshelved_books_report().expect("unshelved books");
        assert!((progress.snapshot()["p11"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn unshelved_membership_refetch_failure_aborts() {
        let api = library();
        let site = Site::new("https://docs.example.com");
        let progress = Progress::new();
        let index = build_index(&api, &progress).expect("index");
        let mut api = library();
        api.details.remove("shelves/7");
        let reporter = Reporter::new(&api, &index, &site, &progress);
        assert!(reporter.unshelved_books_report().is_err());
    }

    #[test]
    fn chapters_report_names_the_parent_book() {
        let api = library();
        with_reporter(&api, |reporter| {
            let table = reporter.chapters_report().expect("chapters report");
            let column = |name| table.column_index(name).expect("column");
            let row = &table.rows[0];
            assert_eq!(row[column("Chapter Name")], "Intro");
            assert_eq!(
                row[column("Chapter URL")],
                "=HYPERLINK(\"https://docs.example.com/books/handbook/chapter/intro\")"
            );
            assert_eq!(row[column("Book Name")], "Handbook");
            assert_eq!(row[column("Description")], "No Description");
        });
    }

    #[test]
    fn duplicate_pages_report_carries_revision_counts() {
        let api = library();
        with_reporter(&api, |reporter| {
            let table = reporter.duplicate_pages_report().expect("duplicate pages");
            assert_eq!(table.rows.len(), 2);
            let column = table.column_index("Revision Count").expect("column");
            let revisions: Vec<&str> =
                table.rows.iter().map(|row| row[column].as_str()).collect();
            assert_eq!(revisions, vec!["3", "1"]);
        });
    }

    #[test]
    fn users_report_hyperlinks_profile_urls_and_marks_inactivity() {
        let api = library();
        with_reporter(&api, |reporter| {
            let table = reporter.users_report().expect("users report");
            let column = |name| table.column_index(name).expect("column");
            let row = &table.rows[0];
            assert_eq!(row[column("Name")], "Ada");
            assert_eq!(row[column("Last Activity At")], "Unknown");
            assert_eq!(
                row[column("Profile URL")],
                "=HYPERLINK(\"https://docs.example.com/user/ada\")"
            );
        });
    }

    #[test]
    fn empty_base_fetch_aborts_the_report() {
        let api = library().list("pages", Vec::new());
        let site = Site::new("https://docs.example.com");
        let progress = Progress::new();
        let index = build_index(&library(), &progress).expect("index");
        let reporter = Reporter::new(&api, &index, &site, &progress);
        assert!(reporter.pages_report().is_err());
        assert!(reporter.duplicate_pages_report().is_err());
    }

    #[test]
    fn progress_clears_after_a_full_run() {
        let api = library();
        let site = Site::new("https://docs.example.com");
        let progress = Progress::new();
        let index = build_index(&api, &progress).expect("index");
        let reporter = Reporter::new(&api, &index, &site, &progress);
        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("report.xlsx");
        let written = reporter.run_reports(&destination).expect("run");
        assert!(written.exists());
        assert!(progress.snapshot().is_empty());
    }
}
