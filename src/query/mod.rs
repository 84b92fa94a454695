//! Query shaping helpers
//!
//! Translates the facade's small declarative surface into driver
//! parameters:
//! - sort tokens (`"city"`, `"-date_added"`) into an ordered sort document
//! - keep/omit field lists into a projection document
//! - an absent filter into the canonical empty filter
//!
//! [`QueryShape`] bundles projection, limit and sort into one value that can
//! be passed explicitly to a single call.

use mongodb::bson::{Bson, Document};
use mongodb::options::{CountOptions, FindOneOptions, FindOptions};

/// Projection marker: keep the listed fields or drop them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Return only the listed fields (`1`).
    Keep,
    /// Return everything except the listed fields (`0`).
    Omit,
}

impl Marker {
    fn value(self) -> i32 {
        match self {
            Marker::Keep => 1,
            Marker::Omit => 0,
        }
    }
}

/// Build an ordered sort document from sort tokens.
///
/// A token beginning with `-` sorts that field descending (`-1`); any other
/// token sorts ascending (`1`). Token order is precedence order. Field
/// names are not validated. A sort document holds each field once, so a
/// repeated field keeps its first token's position and direction.
///
/// # Examples
/// ```
/// use mog::query::sort_order;
/// use mongodb::bson::doc;
///
/// assert_eq!(sort_order(&["st", "-date_added"]), doc! { "st": 1, "date_added": -1 });
/// ```
pub fn sort_order<S: AsRef<str>>(tokens: &[S]) -> Document {
    let mut order = Document::new();
    for token in tokens {
        let token = token.as_ref();
        if token.is_empty() {
            continue;
        }
        let (field, direction) = match token.strip_prefix('-') {
            Some(field) if !field.is_empty() => (field, -1),
            _ => (token, 1),
        };
        if !order.contains_key(field) {
            order.insert(field, direction);
        }
    }
    order
}

/// Build a projection document marking every field with `marker`.
///
/// An empty field list yields `None`, meaning "no projection".
pub fn projection<S: AsRef<str>>(fields: &[S], marker: Marker) -> Option<Document> {
    if fields.is_empty() {
        return None;
    }
    let mut project = Document::new();
    for field in fields {
        project.insert(field.as_ref(), marker.value());
    }
    Some(project)
}

/// Resolve an optional filter to the document sent to the store.
///
/// `None` means "match all" and becomes an empty document; the driver never
/// sees a null filter.
pub fn criteria(filter: Option<Document>) -> Document {
    filter.unwrap_or_default()
}

/// Build the `{_id: id}` filter used by the by-id helpers.
pub fn id_filter(id: impl Into<Bson>) -> Document {
    let mut filter = Document::new();
    filter.insert("_id", id.into());
    filter
}

/// Explicit per-call query options.
///
/// The session's `keep`/`omit`/`set_limit` calls stage one of these and the
/// next query consumes it; `find_with` and friends take one directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryShape {
    /// Projection document
    pub projection: Option<Document>,

    /// Maximum number of documents to return or count
    pub limit: Option<i64>,

    /// Sort document
    pub sort: Option<Document>,
}

impl QueryShape {
    /// Create an empty shape (all fields, no limit, natural order).
    pub fn new() -> Self {
        Self::default()
    }

    /// Return only `fields`. An empty list clears the projection.
    pub fn keep<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.projection = projection(fields, Marker::Keep);
        self
    }

    /// Return everything except `fields`. An empty list clears the projection.
    pub fn omit<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.projection = projection(fields, Marker::Omit);
        self
    }

    /// Limit the result size. Zero or less means no limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Sort by `tokens` (see [`sort_order`]). An empty list clears the sort.
    pub fn sort<S: AsRef<str>>(mut self, tokens: &[S]) -> Self {
        let order = sort_order(tokens);
        self.sort = (!order.is_empty()).then_some(order);
        self
    }

    /// True when the shape carries no options at all.
    pub fn is_empty(&self) -> bool {
        self.projection.is_none() && self.limit.is_none() && self.sort.is_none()
    }

    /// Driver options for a multi-document find.
    pub fn find_options(&self) -> FindOptions {
        let mut options = FindOptions::default();
        options.projection = self.projection.clone();
        options.sort = self.sort.clone();
        options.limit = self.limit;
        options
    }

    /// Driver options for a single-document find. The limit does not apply.
    pub fn find_one_options(&self) -> FindOneOptions {
        let mut options = FindOneOptions::default();
        options.projection = self.projection.clone();
        options.sort = self.sort.clone();
        options
    }

    /// Driver options for a count. Only the limit applies.
    pub fn count_options(&self) -> CountOptions {
        let mut options = CountOptions::default();
        options.limit = self
            .limit
            .and_then(|limit| u64::try_from(limit).ok())
            .filter(|limit| *limit > 0);
        options
    }
}
