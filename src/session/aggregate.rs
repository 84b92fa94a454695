//! Aggregate operations for the session
//!
//! Stage helpers append to the session's pipeline; `agg_run` and
//! `agg_run_all` submit it. The pipeline is never cleared by running it.

use mongodb::bson::Bson;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cursor::RecordIter;
use crate::error::Result;
use crate::pipeline::{AggOptions, JoinPolicy, Pipeline};
use crate::store::DocumentStore;

use super::{Session, guard};

impl<S: DocumentStore> Session<S> {
    /// Start a new, empty pipeline.
    pub fn agg_start(&mut self) {
        self.pipeline = Pipeline::new();
    }

    /// Append `{"$<operator>": params}`.
    pub fn agg_stage(&mut self, operator: &str, params: impl Into<Bson>) {
        self.pipeline.stage(operator, params);
    }

    /// Append a `$project` stage keeping only `fields`.
    pub fn agg_keep<F: AsRef<str>>(&mut self, fields: &[F]) {
        self.pipeline.keep(fields);
    }

    /// Append a `$project` stage dropping `fields`.
    pub fn agg_omit<F: AsRef<str>>(&mut self, fields: &[F]) {
        self.pipeline.omit(fields);
    }

    /// Append a `$sort` stage.
    pub fn agg_sort<F: AsRef<str>>(&mut self, tokens: &[F]) {
        self.pipeline.sort(tokens);
    }

    /// Join each record to the `from` record whose `_id` equals `local_field`.
    ///
    /// Inner join: records without a match are dropped. The match is
    /// embedded under `as_name`, or under `from` when `None`.
    pub fn agg_lookup_by_id(&mut self, from: &str, local_field: &str, as_name: Option<&str>) {
        self.pipeline.lookup_by_id(from, local_field, as_name);
    }

    /// Like [`Session::agg_lookup_by_id`] but keeps records without a match.
    pub fn agg_lookup_by_id_keep_unmatched(
        &mut self,
        from: &str,
        local_field: &str,
        as_name: Option<&str>,
    ) {
        self.pipeline
            .lookup_by_id_with(from, local_field, as_name, JoinPolicy::KeepUnmatched);
    }

    /// Append a `$group` stage computing `count` and `tot_<field>` sums by `group_by`.
    pub fn agg_totals<F: AsRef<str>>(&mut self, group_by: &str, sum_fields: &[F]) {
        self.pipeline.totals(group_by, sum_fields);
    }

    /// The pipeline built so far.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Render the pipeline as JSON (also logged at debug level).
    pub fn agg_show_pipeline(&self) -> String {
        let json = self.pipeline.to_json();
        debug!("pipeline for '{}':\n{}", self.collection, json);
        json
    }

    /// Run the pipeline and open an iterator over its output.
    ///
    /// Walk the results with [`Session::next`], exactly as after a find.
    pub async fn agg_run(&mut self, options: Option<AggOptions>) -> Result<()> {
        self.iter = None;
        let options = options.unwrap_or_default().to_driver();
        let source = guard(
            &self.cancel,
            self.store
                .aggregate(&self.collection, self.pipeline.stages().to_vec(), options),
        )
        .await?;
        self.iter = Some(RecordIter::new(self.collection.clone(), source));
        Ok(())
    }

    /// Run the pipeline and decode every result into a vector.
    pub async fn agg_run_all<T: DeserializeOwned>(
        &mut self,
        options: Option<AggOptions>,
    ) -> Result<Vec<T>> {
        let options = options.unwrap_or_default().to_driver();
        let source = guard(
            &self.cancel,
            self.store
                .aggregate(&self.collection, self.pipeline.stages().to_vec(), options),
        )
        .await?;
        RecordIter::new(self.collection.clone(), source)
            .collect()
            .await
    }
}
