use ndarray::prelude::*;

/// A fitted classifier that can be evaluated against a labeled test set.
///
/// Predictions and labels are 0-indexed class indices into the same class
/// list. `score` is the model's own overall scoring rule, so it is not
/// required to equal the accuracy of its predictions.
pub trait Estimator {
	type Error: std::error::Error + 'static;

	/// Predict a class index for each row of `features`.
	fn predict(&self, features: ArrayView2<f32>) -> Result<Array1<usize>, Self::Error>;

	/// Compute the model's own overall score on the given test set.
	fn score(&self, features: ArrayView2<f32>, labels: ArrayView1<usize>)
		-> Result<f32, Self::Error>;
}
