use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Column a page of queue stats is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "snake_case")]
pub enum SortProperty {
    #[default]
    CreatedTime,
    QueueName,
    ServiceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: SortProperty,
    pub direction: Direction,
}

/// Request for one page of a tenant's records.
///
/// `text_search` matches queue names case-insensitively as a substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    pub page_size: u32,
    #[builder(default)]
    #[serde(default)]
    pub page: u32,
    #[builder(into)]
    pub text_search: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl PageLink {
    pub fn new(page_size: u32, page: u32) -> Self {
        Self {
            page_size,
            page,
            text_search: None,
            sort_order: SortOrder::default(),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }

    /// Normalized search needle, or `None` when the search is empty.
    pub fn search_needle(&self) -> Option<String> {
        self.text_search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(fold_search)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.page_size < 1 {
            return Err(Error::invalid_argument(
                "Incorrect page link page size '0'. Page size must be greater than zero.",
            ));
        }
        Ok(())
    }
}

/// Case folding shared by stored queue names and search needles, so every
/// store agrees on what matches.
pub fn fold_search(text: &str) -> String {
    text.to_lowercase()
}

/// One page of results together with totals for the whole query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub data: Vec<T>,
    pub total_pages: u64,
    pub total_elements: u64,
    pub has_next: bool,
}

impl<T> PageData<T> {
    pub fn new(data: Vec<T>, total_elements: u64, link: &PageLink) -> Self {
        let page_size = u64::from(link.page_size.max(1));
        let total_pages = total_elements.div_ceil(page_size);
        let has_next = u64::from(link.page) + 1 < total_pages;

        Self {
            data,
            total_pages,
            total_elements,
            has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let link = PageLink::new(10, 0);
        let page = PageData::new(vec![0u8; 10], 25, &link);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);

        let last = PageData::new(vec![0u8; 5], 25, &PageLink::new(10, 2));
        assert!(!last.has_next);

        let empty = PageData::<u8>::new(vec![], 0, &link);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = PageLink::new(0, 0).validate().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_search_needle() {
        let link = PageLink::builder()
            .page_size(5)
            .text_search("  Main ".to_owned())
            .build();
        assert_eq!(link.search_needle().as_deref(), Some("main"));
        assert_eq!(link.offset(), 0);

        let blank = PageLink::builder()
            .page_size(5)
            .page(2)
            .text_search("   ".to_owned())
            .build();
        assert_eq!(blank.search_needle(), None);
        assert_eq!(blank.offset(), 10);
    }

    #[test]
    fn test_search_folds_non_ascii() {
        let link = PageLink::builder()
            .page_size(5)
            .text_search("ÄRGER".to_owned())
            .build();
        assert_eq!(link.search_needle().as_deref(), Some("ärger"));
        assert_eq!(fold_search("ÄRGER-Queue"), "ärger-queue");
    }

    #[test]
    fn test_huge_offset_does_not_overflow() {
        let link = PageLink::new(u32::MAX, u32::MAX);
        assert!(link.validate().is_ok());
        assert!(link.offset() > i64::MAX as u64);

        let page = PageData::<u8>::new(vec![], 3, &link);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next);
    }

    #[test]
    fn test_sort_sql_names() {
        assert_eq!(SortProperty::CreatedTime.to_string(), "created_time");
        assert_eq!(SortProperty::QueueName.to_string(), "queue_name");
        assert_eq!(Direction::Desc.to_string(), "DESC");
    }
}
