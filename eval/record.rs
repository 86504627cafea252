use serde::Serialize;

/// The column names of a [`TestMetricsRecord`](struct.TestMetricsRecord.html), in serialization order.
pub const COLUMN_NAMES: [&str; 8] = [
	"model",
	"dataset",
	"accuracy",
	"precision",
	"recall",
	"f1",
	"balanced_accuracy",
	"overall_test_set_performance",
];

/// One row of test set metrics for a single model evaluated on a single dataset.
///
/// The field declaration order fixes the column order, so records from
/// repeated calls are schema-identical and can be stacked into a table.
/// The precision, recall, and f1 columns are support-weighted averages of
/// the per-class values, and any of the numeric columns can be NaN when the
/// underlying statistic is undefined.
#[derive(Clone, Debug, Serialize)]
pub struct TestMetricsRecord {
	pub model: String,
	pub dataset: String,
	pub accuracy: f32,
	pub precision: f32,
	pub recall: f32,
	pub f1: f32,
	pub balanced_accuracy: f32,
	pub overall_test_set_performance: f32,
}
