use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Normalized query input consumed by every marketplace adapter.
///
/// Built once per query through [`SearchParams::builder`] and immutable
/// afterwards. Size labels are kept as given; mapping them to
/// marketplace-internal ids is the adapter's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    keyword: String,
    sizes: Vec<String>,
    page: Option<u32>,
    item_count: Option<u32>,
}

impl SearchParams {
    pub fn builder(keyword: impl Into<String>) -> SearchParamsBuilder {
        SearchParamsBuilder {
            keyword: keyword.into(),
            sizes: Vec::new(),
            page: None,
            item_count: None,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    /// 1-based page number, if one was requested.
    pub fn page(&self) -> Option<u32> {
        self.page
    }

    /// Requested page size, if one was given.
    pub fn item_count(&self) -> Option<u32> {
        self.item_count
    }
}

#[derive(Debug, Clone)]
pub struct SearchParamsBuilder {
    keyword: String,
    sizes: Vec<String>,
    page: Option<u32>,
    item_count: Option<u32>,
}

impl SearchParamsBuilder {
    pub fn sizes<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sizes = sizes.into_iter().map(Into::into).collect();
        self
    }

    /// Page number, 1-based.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn item_count(mut self, item_count: u32) -> Self {
        self.item_count = Some(item_count);
        self
    }

    pub fn build(self) -> Result<SearchParams> {
        if self.keyword.trim().is_empty() {
            return Err(Error::InvalidArgument("keyword must not be empty".into()));
        }
        if self.page == Some(0) {
            return Err(Error::InvalidArgument("page numbers are 1-based".into()));
        }
        Ok(SearchParams {
            keyword: self.keyword,
            sizes: self.sizes,
            page: self.page,
            item_count: self.item_count,
        })
    }
}

/// One normalized search result, independent of which marketplace
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub size: Option<String>,
    pub url: String,
    pub images: Vec<String>,
}

/// Ordered, read-only collection of parsed items. Insertion order is the
/// response order reported by the marketplace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    items: Vec<Item>,
}

impl SearchResults {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Rebuild results from a previously serialized item list.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<Item> = serde_json::from_str(json)?;
        Ok(Self { items })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.items)?)
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn all(&self) -> &[Item] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }
}

impl fmt::Display for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total search results: {}", self.count())?;
        for (i, item) in self.items.iter().enumerate() {
            write!(
                f,
                "\nItem {}: ID={}, Title={}, Price={}, Size={}, URL={}",
                i + 1,
                item.id,
                item.title,
                item.price,
                item.size.as_deref().unwrap_or("-"),
                item.url,
            )?;
        }
        Ok(())
    }
}
