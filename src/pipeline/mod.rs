//! Aggregation pipeline assembly
//!
//! [`Pipeline`] is an ordered list of single-key stage documents built up
//! one call at a time and handed to the store as-is. Running a pipeline
//! does not clear it; start a new one to reuse the builder.

use std::time::Duration;

use mongodb::bson::{Bson, Document, doc};
use mongodb::options::AggregateOptions;

use crate::query::{Marker, projection, sort_order};

/// Ordered list of aggregation stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Document>,
}

/// How [`Pipeline::lookup_by_id_with`] treats input records without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Drop input records whose lookup found nothing (plain `$unwind`).
    Inner,
    /// Keep them, with the joined field absent.
    KeepUnmatched,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `{"$<operator>": params}`.
    ///
    /// A leading `$` on `operator` is accepted and not doubled.
    pub fn stage(&mut self, operator: &str, params: impl Into<Bson>) -> &mut Self {
        let name = operator.trim_start_matches('$');
        let mut stage = Document::new();
        stage.insert(format!("${name}"), params.into());
        self.stages.push(stage);
        self
    }

    /// Append a `$project` stage keeping only `fields`.
    pub fn keep<S: AsRef<str>>(&mut self, fields: &[S]) -> &mut Self {
        self.project(fields, Marker::Keep)
    }

    /// Append a `$project` stage dropping `fields`.
    pub fn omit<S: AsRef<str>>(&mut self, fields: &[S]) -> &mut Self {
        self.project(fields, Marker::Omit)
    }

    fn project<S: AsRef<str>>(&mut self, fields: &[S], marker: Marker) -> &mut Self {
        if let Some(project) = projection(fields, marker) {
            self.stage("project", project);
        }
        self
    }

    /// Append a `$sort` stage; tokens follow [`sort_order`].
    pub fn sort<S: AsRef<str>>(&mut self, tokens: &[S]) -> &mut Self {
        let order = sort_order(tokens);
        if !order.is_empty() {
            self.stage("sort", order);
        }
        self
    }

    /// Join each record to the `from` record whose `_id` equals `local_field`.
    ///
    /// Appends `$lookup` followed by `$unwind`, embedding the single match
    /// under `as_name` (default: `from`). This is an inner join: a record
    /// with no match is dropped from the output. A record with several
    /// matches is emitted once per match.
    pub fn lookup_by_id(
        &mut self,
        from: &str,
        local_field: &str,
        as_name: Option<&str>,
    ) -> &mut Self {
        self.lookup_by_id_with(from, local_field, as_name, JoinPolicy::Inner)
    }

    /// [`Pipeline::lookup_by_id`] with an explicit policy for unmatched records.
    pub fn lookup_by_id_with(
        &mut self,
        from: &str,
        local_field: &str,
        as_name: Option<&str>,
        policy: JoinPolicy,
    ) -> &mut Self {
        let as_name = as_name.unwrap_or(from);
        self.stage(
            "lookup",
            doc! {
                "from": from,
                "localField": local_field,
                "foreignField": "_id",
                "as": as_name,
            },
        );
        let path = format!("${as_name}");
        match policy {
            JoinPolicy::Inner => self.stage("unwind", path),
            JoinPolicy::KeepUnmatched => self.stage(
                "unwind",
                doc! { "path": path, "preserveNullAndEmptyArrays": true },
            ),
        }
    }

    /// Append a `$group` stage keyed by `group_by` with a `count` and one
    /// `tot_<field>` sum per entry in `sum_fields`.
    pub fn totals<S: AsRef<str>>(&mut self, group_by: &str, sum_fields: &[S]) -> &mut Self {
        let mut group = doc! {
            "_id": format!("${group_by}"),
            "count": { "$sum": 1 },
        };
        for field in sum_fields {
            let field = field.as_ref();
            group.insert(format!("tot_{field}"), doc! { "$sum": format!("${field}") });
        }
        self.stage("group", group)
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Document] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Render the pipeline as pretty relaxed extended JSON.
    pub fn to_json(&self) -> String {
        let stages: Vec<Bson> = self.stages.iter().cloned().map(Bson::Document).collect();
        let value = Bson::Array(stages).into_relaxed_extjson();
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

impl From<Vec<Document>> for Pipeline {
    fn from(stages: Vec<Document>) -> Self {
        Self { stages }
    }
}

/// Options for running a pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggOptions {
    /// Server-side time limit
    pub max_time: Option<Duration>,

    /// Allow stages to spill to disk
    pub allow_disk_use: bool,

    /// Cursor batch size
    pub batch_size: Option<u32>,

    /// Comment attached to the command (visible in profiler and `$currentOp`)
    pub comment: Option<String>,
}

impl AggOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn allow_disk_use(mut self, allow: bool) -> Self {
        self.allow_disk_use = allow;
        self
    }

    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Driver options for `aggregate`.
    pub fn to_driver(&self) -> AggregateOptions {
        let mut options = AggregateOptions::default();
        if self.allow_disk_use {
            options.allow_disk_use = Some(true);
        }
        options.max_time = self.max_time;
        options.batch_size = self.batch_size;
        options.comment = self.comment.clone().map(Bson::String);
        options
    }
}

/// Read the `tot_<field>` sum from a group produced by [`Pipeline::totals`].
///
/// For callers decoding results as plain documents.
pub fn total_of(group: &Document, field: &str) -> Option<f64> {
    match group.get(format!("tot_{field}"))? {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}
