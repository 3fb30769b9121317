use serde::Serialize;

/// A bounded slice of an ordered result set plus paging metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub per_page: u32,
    pub total_items: i64,
}

pub fn per_page_or(requested: Option<u32>, default: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, 100)
}

/// Computes the effective page, total page count and row offset for a slice.
///
/// An out-of-range page clamps to the nearest valid one instead of failing,
/// so the items come back empty only when the whole set is empty.
pub fn slice_bounds(total_items: i64, requested_page: u32, per_page: u32) -> (u32, u32, i64) {
    let per_page = per_page.max(1) as i64;
    let total_pages = ((total_items + per_page - 1) / per_page) as u32;
    let current_page = requested_page.clamp(1, total_pages.max(1));
    let offset = (current_page as i64 - 1) * per_page;
    (current_page, total_pages, offset)
}
