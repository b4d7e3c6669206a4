//! Pipeline stages for page-images-to-PDF assembly.
//!
//! Each submodule implements exactly one transformation step and can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! load ──▶ flatten ──▶ encode ──▶ pdf
//! (read+decode) (alpha→RGB) (JPEG)   (lopdf)
//! ```
//!
//! 1. [`load`]: read one page file through a [`crate::storage::PageStore`]
//!    and classify it as decoded, corrupt, or missing
//! 2. [`flatten`]: composite any alpha channel onto an opaque background
//! 3. [`encode`]: baseline JPEG for `DCTDecode` embedding
//! 4. [`pdf`]: build the page tree and serialise the document

pub mod encode;
pub mod flatten;
pub mod load;
pub mod pdf;
