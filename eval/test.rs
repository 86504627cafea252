use crate::{Estimator, TestMetricsRecord};
use ndarray::prelude::*;
use thiserror::Error;
use vintner_metrics::{
	MulticlassClassificationMetrics, MulticlassClassificationMetricsInput, StreamingMetric,
};

#[derive(Debug, Error)]
pub enum TestError<E>
where
	E: std::error::Error + 'static,
{
	/// An error raised by the model's `predict` or `score`, passed through to
	/// the caller unchanged.
	#[error(transparent)]
	Model(E),
	#[error("the feature batch has {n_rows} rows but there are {n_labels} labels")]
	LabelCountMismatch { n_rows: usize, n_labels: usize },
	#[error("class index {label} is out of range for {n_classes} classes")]
	LabelOutOfRange { label: usize, n_classes: usize },
}

/// Evaluate a fitted classifier against a labeled test set, producing one
/// [`TestMetricsRecord`](struct.TestMetricsRecord.html) tagged with the
/// dataset name and the model name.
///
/// `labels` holds the true class index for each row of `features`, aligned
/// by position, and `n_classes` is the number of classes in the class list
/// the indices refer to. A row count mismatch between `features` and
/// `labels` is an error, never a silent truncation.
pub fn test_classifier<E>(
	model: &E,
	features: ArrayView2<f32>,
	labels: ArrayView1<usize>,
	n_classes: usize,
	dataset: &str,
	model_name: &str,
) -> Result<TestMetricsRecord, TestError<E::Error>>
where
	E: Estimator,
{
	if features.nrows() != labels.len() {
		return Err(TestError::LabelCountMismatch {
			n_rows: features.nrows(),
			n_labels: labels.len(),
		});
	}
	if let Some(&label) = labels.iter().find(|&&label| label >= n_classes) {
		return Err(TestError::LabelOutOfRange { label, n_classes });
	}
	let predictions = model.predict(features).map_err(TestError::Model)?;
	if let Some(&label) = predictions.iter().find(|&&label| label >= n_classes) {
		return Err(TestError::LabelOutOfRange { label, n_classes });
	}
	let mut test_metrics = MulticlassClassificationMetrics::new(n_classes);
	test_metrics.update(MulticlassClassificationMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let test_metrics = test_metrics.finalize();
	let overall_test_set_performance = model.score(features, labels).map_err(TestError::Model)?;
	Ok(TestMetricsRecord {
		model: model_name.to_owned(),
		dataset: dataset.to_owned(),
		accuracy: test_metrics.accuracy,
		precision: test_metrics.precision_weighted,
		recall: test_metrics.recall_weighted,
		f1: test_metrics.f1_weighted,
		balanced_accuracy: test_metrics.balanced_accuracy,
		overall_test_set_performance,
	})
}

/// A test double that returns fixed predictions and a fixed score.
#[cfg(test)]
struct StubClassifier {
	predictions: Vec<usize>,
	score: f32,
}

#[cfg(test)]
impl Estimator for StubClassifier {
	type Error = std::convert::Infallible;

	fn predict(&self, _features: ArrayView2<f32>) -> Result<Array1<usize>, Self::Error> {
		Ok(Array1::from(self.predictions.clone()))
	}

	fn score(
		&self,
		_features: ArrayView2<f32>,
		_labels: ArrayView1<usize>,
	) -> Result<f32, Self::Error> {
		Ok(self.score)
	}
}

#[cfg(test)]
#[derive(Debug, Error)]
#[error("this model has not been fitted")]
struct NotFittedError;

#[cfg(test)]
struct UnfittedClassifier;

#[cfg(test)]
impl Estimator for UnfittedClassifier {
	type Error = NotFittedError;

	fn predict(&self, _features: ArrayView2<f32>) -> Result<Array1<usize>, Self::Error> {
		Err(NotFittedError)
	}

	fn score(
		&self,
		_features: ArrayView2<f32>,
		_labels: ArrayView1<usize>,
	) -> Result<f32, Self::Error> {
		Err(NotFittedError)
	}
}

#[test]
fn test_accuracy() {
	let model = StubClassifier {
		predictions: vec![0, 0, 1],
		score: 2.0 / 3.0,
	};
	let features = Array2::<f32>::zeros((3, 2));
	let labels = arr1(&[0, 1, 1]);
	let record = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"stub",
	)
	.unwrap();
	assert_eq!(record.accuracy, 2.0 / 3.0);
}

#[test]
fn test_class_never_predicted() {
	// The second class is never predicted, so its precision is 0 / 0 and is
	// excluded from the weighted precision rather than counted as zero.
	let model = StubClassifier {
		predictions: vec![0, 0, 0, 0],
		score: 0.5,
	};
	let features = Array2::<f32>::zeros((4, 2));
	let labels = arr1(&[0, 0, 1, 1]);
	let record = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"majority",
	)
	.unwrap();
	insta::assert_debug_snapshot!(record, @r###"
 TestMetricsRecord {
     model: "majority",
     dataset: "wine_quality",
     accuracy: 0.5,
     precision: 0.5,
     recall: 0.5,
     f1: 0.33333334,
     balanced_accuracy: 0.5,
     overall_test_set_performance: 0.5,
 }
 "###);
}

#[test]
fn test_column_order() {
	let model = StubClassifier {
		predictions: vec![0, 1],
		score: 1.0,
	};
	let features = Array2::<f32>::zeros((2, 1));
	let labels = arr1(&[0, 1]);
	let record = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"stub",
	)
	.unwrap();
	let json = serde_json::to_string(&record).unwrap();
	let mut last_index = None;
	for column in crate::COLUMN_NAMES.iter() {
		// Match the serialized key, colon included, so that one column name
		// being a suffix of another cannot satisfy the check.
		let index = json.find(&format!("\"{}\":", column)).unwrap();
		if let Some(last_index) = last_index {
			assert!(index > last_index);
		}
		last_index = Some(index);
	}
}

#[test]
fn test_overall_score_is_the_models_own() {
	// The model's own scoring rule does not have to equal accuracy.
	let model = StubClassifier {
		predictions: vec![0, 1],
		score: 0.25,
	};
	let features = Array2::<f32>::zeros((2, 1));
	let labels = arr1(&[0, 1]);
	let record = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"stub",
	)
	.unwrap();
	assert_eq!(record.accuracy, 1.0);
	assert_eq!(record.overall_test_set_performance, 0.25);
	assert_ne!(record.accuracy, record.overall_test_set_performance);
}

#[test]
fn test_determinism() {
	let model = StubClassifier {
		predictions: vec![0, 0, 0, 0],
		score: 0.5,
	};
	let features = Array2::<f32>::zeros((4, 2));
	let labels = arr1(&[0, 0, 1, 1]);
	let a = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"majority",
	)
	.unwrap();
	let b = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"majority",
	)
	.unwrap();
	assert_eq!(a.accuracy.to_bits(), b.accuracy.to_bits());
	assert_eq!(a.precision.to_bits(), b.precision.to_bits());
	assert_eq!(a.recall.to_bits(), b.recall.to_bits());
	assert_eq!(a.f1.to_bits(), b.f1.to_bits());
	assert_eq!(a.balanced_accuracy.to_bits(), b.balanced_accuracy.to_bits());
	assert_eq!(
		a.overall_test_set_performance.to_bits(),
		b.overall_test_set_performance.to_bits()
	);
}

#[test]
fn test_label_count_mismatch() {
	let model = StubClassifier {
		predictions: vec![0, 1, 1],
		score: 1.0,
	};
	let features = Array2::<f32>::zeros((3, 2));
	let labels = arr1(&[0, 1]);
	let result = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"stub",
	);
	assert!(matches!(
		result,
		Err(TestError::LabelCountMismatch {
			n_rows: 3,
			n_labels: 2,
		})
	));
}

#[test]
fn test_label_out_of_range() {
	let model = StubClassifier {
		predictions: vec![0, 1],
		score: 1.0,
	};
	let features = Array2::<f32>::zeros((2, 1));
	let labels = arr1(&[0, 2]);
	let result = test_classifier(
		&model,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"stub",
	);
	assert!(matches!(
		result,
		Err(TestError::LabelOutOfRange {
			label: 2,
			n_classes: 2,
		})
	));
}

#[test]
fn test_model_error_propagates() {
	let features = Array2::<f32>::zeros((2, 1));
	let labels = arr1(&[0, 1]);
	let result = test_classifier(
		&UnfittedClassifier,
		features.view(),
		labels.view(),
		2,
		"wine_quality",
		"unfitted",
	);
	let error = result.err().unwrap();
	assert_eq!(error.to_string(), "this model has not been fitted");
}
