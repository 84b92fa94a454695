//! Ordered bulk batch accumulation

use mongodb::bson::Document;

use crate::store::BulkOp;

/// Client-assembled list of writes submitted as one ordered request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkBatch {
    ops: Vec<BulkOp>,
}

impl BulkBatch {
    /// Create an empty batch sized for roughly `estimated` operations.
    pub fn with_capacity(estimated: usize) -> Self {
        Self {
            ops: Vec::with_capacity(estimated),
        }
    }

    /// Append an insert.
    pub fn add_insert(&mut self, document: Document) {
        self.ops.push(BulkOp::Insert(document));
    }

    /// Append an update-many.
    pub fn add_update(&mut self, filter: Document, update: Document) {
        self.ops.push(BulkOp::UpdateMany { filter, update });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations in submission order.
    pub fn ops(&self) -> &[BulkOp] {
        &self.ops
    }

    /// Consume the batch, yielding its operations in order.
    pub fn into_ops(self) -> Vec<BulkOp> {
        self.ops
    }
}
