//! # bookpress – manuscript → styled, paginated PDF books
//!
//! This crate turns a structured manuscript (book config, chapter outline,
//! markup chapter bodies, image assets) into a reproducible, fully
//! paginated PDF. The pipeline stages are:
//!
//! 1. **Parse** – chapter markup → block sequence ([`markup`])
//! 2. **Style** – resolve the theme palette and fonts ([`style`], [`fonts`])
//! 3. **Break** – wrap styled spans into measured lines ([`linebreak`])
//! 4. **Paginate** – flow blocks onto pages, with table of contents and
//!    footers filled in deferred passes ([`pagination`], [`compose`])
//! 5. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! Chapter prose can be supplied in the manifest or drafted by the
//! [`generate`] collaborator; [`docx`] offers an alternate flowed export.

pub mod book;
pub mod compose;
pub mod docx;
pub mod error;
pub mod fonts;
pub mod generate;
pub mod images;
pub mod linebreak;
pub mod markup;
pub mod page_plan;
pub mod pagination;
pub mod render;
pub mod samples;
pub mod style;

// Re-exports for convenience
pub use compose::{compose_document, render_book, Manifest, RenderOptions};
pub use error::{Error, Result};
