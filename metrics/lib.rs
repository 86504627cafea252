/*!
This crate defines the [`StreamingMetric`](trait.StreamingMetric.html) trait and a number of concrete types that implement it, such as [`Accuracy`](struct.Accuracy.html) and [`MulticlassClassificationMetrics`](struct.MulticlassClassificationMetrics.html), which computes classification performance metrics from a confusion matrix.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod accuracy;
mod mean;
mod multiclass_classification;

pub use self::accuracy::Accuracy;
pub use self::mean::Mean;
pub use self::multiclass_classification::{
	ClassMetrics, MulticlassClassificationMetrics, MulticlassClassificationMetricsInput,
	MulticlassClassificationMetricsOutput,
};

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input is available in chunks.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`. This is useful when computing a metric across multiple threads. When finished aggregating, you can call `finalize()` on the metric to produce the associated type `Output`.

# Examples

Here is a basic example implementation of a `Min` metric, which takes `f32`s as input and produces an `f32` as output that is the minimum of all the inputs.

```
use vintner_metrics::StreamingMetric;

struct Min(f32);

impl StreamingMetric<'_> for Min {
	type Input = f32;
	type Output = f32;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.min(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.min(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}
```

The seemingly unused generic lifetime `'a` exists here to allow `Input`s and `Output`s to borrow from their enclosing scope. When Rust stabilizes Generic Associated Types (GATs), the generic lifetime will move to the associated types.

*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
