//! Converter contract: HTML->Markdown conversion (an external library
//! contract, `html2md`), plus Markdown and plain-text pass-through readers.

mod converter;

pub use converter::{fence_as_code_block, Converter, Html2MdConverter};
