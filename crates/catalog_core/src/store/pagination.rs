//! Offset cursor codec shared by every `list` operation.
//!
//! # Contract
//! - A page token is the base64 text of a decimal row offset.
//! - Empty or malformed tokens decode to offset `0` instead of failing.
//! - A page asks for `page_size + 1` rows; the extra row only signals that a
//!   next page exists and is never returned.
//!
//! Offsets index a live table, so rows inserted or deleted between page
//! fetches can shift later pages: a reader may then skip or see a row twice.
//! Stable ordering only guarantees completeness against an unchanged table.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Page size used when the caller does not supply a positive one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One page of rows plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when this is the last page; never `Some("")`.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }
}

/// Encodes a row offset as an opaque page token.
pub fn encode_page_token(offset: u64) -> String {
    STANDARD.encode(offset.to_string())
}

/// Decodes a page token; `None` when the token is not one we produced.
pub fn decode_page_token(token: &str) -> Option<u64> {
    let bytes = STANDARD.decode(token.trim()).ok()?;
    let text = std::str::from_utf8(&bytes).ok()?;
    text.parse::<u64>().ok()
}

/// Resolved `LIMIT`/`OFFSET` for one list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageWindow {
    pub size: u32,
    pub offset: u64,
}

impl PageWindow {
    pub fn resolve(page_token: Option<&str>, page_size: Option<u32>) -> Self {
        let size = match page_size {
            Some(size) if size > 0 => size,
            _ => DEFAULT_PAGE_SIZE,
        };
        let offset = page_token.and_then(decode_page_token).unwrap_or(0);
        Self { size, offset }
    }

    /// Rows to request: one more than the page size.
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.size) + 1
    }

    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    /// Trims the probe row and emits the next token when it was present.
    pub fn finish<T>(self, mut rows: Vec<T>) -> Page<T> {
        let page_len = self.size as usize;
        if rows.len() > page_len {
            rows.truncate(page_len);
            return Page {
                items: rows,
                next_page_token: Some(encode_page_token(self.offset + u64::from(self.size))),
            };
        }
        Page {
            items: rows,
            next_page_token: None,
        }
    }
}
