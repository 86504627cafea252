/*!
This crate evaluates a fitted classifier against a labeled test set. [`test_classifier`](fn.test_classifier.html) produces one [`TestMetricsRecord`](struct.TestMetricsRecord.html) per call, tagged with a model name and a dataset name, so that a caller can stack the records from many models and datasets into a single table.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod estimator;
mod record;
mod test;

pub use self::estimator::Estimator;
pub use self::record::{TestMetricsRecord, COLUMN_NAMES};
pub use self::test::{test_classifier, TestError};
