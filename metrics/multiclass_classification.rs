use super::StreamingMetric;
use itertools::izip;
use ndarray::prelude::*;
#[cfg(test)]
use ndarray::s;
use num_traits::ToPrimitive;

/// MulticlassClassificationMetrics computes common metrics used to evaluate multiclass classifiers from predicted and true class indices.
pub struct MulticlassClassificationMetrics {
	/// The shape of the confusion matrix is (n_classes x n_classes).
	confusion_matrix: Array2<u64>,
}

pub struct MulticlassClassificationMetricsInput<'a> {
	// (n_examples), 0-indexed predicted class indices
	pub predictions: ArrayView1<'a, usize>,
	// (n_examples), 0-indexed true class indices
	pub labels: ArrayView1<'a, usize>,
}

#[derive(Debug)]
pub struct MulticlassClassificationMetricsOutput {
	/// The metrics computed for each class.
	pub class_metrics: Vec<ClassMetrics>,
	/// The fraction of examples whose predicted class is equal to the true class.
	pub accuracy: f32,
	/// The per-class precisions averaged with each class's support as its weight. Classes whose precision is undefined are excluded from the average.
	pub precision_weighted: f32,
	/// The per-class recalls averaged with each class's support as its weight. Classes whose recall is undefined are excluded from the average.
	pub recall_weighted: f32,
	/// The per-class f1 scores averaged with each class's support as its weight. Classes whose f1 score is undefined are excluded from the average.
	pub f1_weighted: f32,
	/// The unweighted mean of the per-class recalls over the classes that appear in the true labels. Unlike the weighted metrics above, this is insensitive to class imbalance.
	pub balanced_accuracy: f32,
}

#[derive(Debug)]
pub struct ClassMetrics {
	pub true_positives: u64,
	pub false_positives: u64,
	pub true_negatives: u64,
	pub false_negatives: u64,
	/// The number of examples whose true class is this class.
	pub support: u64,
	/// tp / (tp + fp). NaN when this class was never predicted.
	pub precision: f32,
	/// tp / (tp + fn). NaN when this class has zero support.
	pub recall: f32,
	/// 2tp / (2tp + fp + fn). NaN when this class appears in neither the predictions nor the labels.
	pub f1_score: f32,
}

impl MulticlassClassificationMetrics {
	pub fn new(n_classes: usize) -> Self {
		//                                           prediction    label
		//                                               |           |
		//                                               v           v
		let confusion_matrix = <Array2<u64>>::zeros((n_classes, n_classes));
		Self { confusion_matrix }
	}
}

impl<'a> StreamingMetric<'a> for MulticlassClassificationMetrics {
	type Input = MulticlassClassificationMetricsInput<'a>;
	type Output = MulticlassClassificationMetricsOutput;

	fn update(&mut self, value: MulticlassClassificationMetricsInput) {
		for (prediction, label) in izip!(value.predictions.iter(), value.labels.iter()) {
			self.confusion_matrix[(*prediction, *label)] += 1;
		}
	}

	fn merge(&mut self, other: Self) {
		self.confusion_matrix += &other.confusion_matrix;
	}

	fn finalize(self) -> MulticlassClassificationMetricsOutput {
		let n_classes = self.confusion_matrix.nrows();
		let n_examples = self.confusion_matrix.sum();
		let confusion_matrix = self.confusion_matrix;
		let class_metrics: Vec<_> = (0..n_classes)
			.map(|class_index| {
				let true_positives = confusion_matrix[(class_index, class_index)];
				let false_positives = confusion_matrix.row(class_index).sum() - true_positives;
				let false_negatives = confusion_matrix.column(class_index).sum() - true_positives;
				let true_negatives =
					n_examples - true_positives - false_positives - false_negatives;
				let support = true_positives + false_negatives;
				// 0 / 0 is deliberately left as NaN here, so that undefined
				// values are excluded from the averages below instead of
				// counting as zero.
				let precision = true_positives.to_f32().unwrap()
					/ (true_positives + false_positives).to_f32().unwrap();
				let recall = true_positives.to_f32().unwrap() / support.to_f32().unwrap();
				let f1_score = (2 * true_positives).to_f32().unwrap()
					/ (2 * true_positives + false_positives + false_negatives)
						.to_f32()
						.unwrap();
				ClassMetrics {
					true_positives,
					false_positives,
					true_negatives,
					false_negatives,
					support,
					precision,
					recall,
					f1_score,
				}
			})
			.collect();
		let n_correct: u64 = confusion_matrix.diag().sum();
		let accuracy = n_correct.to_f32().unwrap() / n_examples.to_f32().unwrap();
		let supports: Vec<f32> = class_metrics
			.iter()
			.map(|class| class.support.to_f32().unwrap())
			.collect();
		let precision_weighted = nan_average(
			class_metrics.iter().map(|class| class.precision),
			&supports,
		);
		let recall_weighted =
			nan_average(class_metrics.iter().map(|class| class.recall), &supports);
		let f1_weighted = nan_average(
			class_metrics.iter().map(|class| class.f1_score),
			&supports,
		);
		let balanced_accuracy = nan_mean(class_metrics.iter().map(|class| class.recall));
		MulticlassClassificationMetricsOutput {
			class_metrics,
			accuracy,
			precision_weighted,
			recall_weighted,
			f1_weighted,
			balanced_accuracy,
		}
	}
}

/// Average `values` with the given `weights`, dropping NaN values and their weights from the average. Returns NaN when every value is NaN. When the surviving weights sum to zero, the surviving values are averaged unweighted instead.
fn nan_average(values: impl Iterator<Item = f32>, weights: &[f32]) -> f32 {
	let mut sum = 0.0f32;
	let mut weight_sum = 0.0f32;
	let mut unweighted_sum = 0.0f32;
	let mut count: u64 = 0;
	for (value, weight) in izip!(values, weights.iter()) {
		if value.is_nan() {
			continue;
		}
		sum += value * weight;
		weight_sum += weight;
		unweighted_sum += value;
		count += 1;
	}
	if count == 0 {
		return f32::NAN;
	}
	if weight_sum == 0.0 {
		return unweighted_sum / count.to_f32().unwrap();
	}
	sum / weight_sum
}

/// The unweighted mean of the non-NaN `values`. Returns NaN when every value is NaN.
fn nan_mean(values: impl Iterator<Item = f32>) -> f32 {
	let mut sum = 0.0f32;
	let mut count: u64 = 0;
	for value in values {
		if value.is_nan() {
			continue;
		}
		sum += value;
		count += 1;
	}
	if count == 0 {
		return f32::NAN;
	}
	sum / count.to_f32().unwrap()
}

#[test]
fn test_multiclass() {
	// example taken from https://en.wikipedia.org/wiki/Confusion_matrix
	let mut metrics = MulticlassClassificationMetrics::new(3);
	let labels = arr1(&[
		0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 1, 2, 2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
	]);
	let predictions = arr1(&[
		0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
	]);
	metrics.update(MulticlassClassificationMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let metrics = metrics.finalize();
	assert_eq!(metrics.class_metrics[0].true_positives, 5);
	assert_eq!(metrics.class_metrics[0].false_positives, 2);
	assert_eq!(metrics.class_metrics[0].false_negatives, 3);
	assert_eq!(metrics.class_metrics[0].support, 8);
	assert_eq!(metrics.class_metrics[0].precision, 0.71428573);
	assert_eq!(metrics.class_metrics[0].recall, 0.625);
	assert_eq!(metrics.class_metrics[0].f1_score, 0.6666667);
	assert_eq!(metrics.class_metrics[1].true_positives, 3);
	assert_eq!(metrics.class_metrics[1].false_positives, 5);
	assert_eq!(metrics.class_metrics[1].false_negatives, 3);
	assert_eq!(metrics.class_metrics[1].support, 6);
	assert_eq!(metrics.class_metrics[1].precision, 0.375);
	assert_eq!(metrics.class_metrics[1].recall, 0.5);
	assert_eq!(metrics.class_metrics[1].f1_score, 0.42857143);
	assert_eq!(metrics.class_metrics[2].true_positives, 11);
	assert_eq!(metrics.class_metrics[2].false_positives, 1);
	assert_eq!(metrics.class_metrics[2].false_negatives, 2);
	assert_eq!(metrics.class_metrics[2].support, 13);
	assert_eq!(metrics.class_metrics[2].precision, 0.9166667);
	assert_eq!(metrics.class_metrics[2].recall, 0.84615386);
	assert_eq!(metrics.class_metrics[2].f1_score, 0.88);
	assert_eq!(metrics.accuracy, 0.7037037);
	assert_eq!(metrics.precision_weighted, 0.7363316);
	assert_eq!(metrics.recall_weighted, 0.7037037);
	let f1_weighted =
		((10.0f32 / 15.0) * 8.0 + (6.0f32 / 14.0) * 6.0 + (22.0f32 / 25.0) * 13.0) / 27.0;
	assert_eq!(metrics.f1_weighted, f1_weighted);
	assert_eq!(metrics.balanced_accuracy, 0.65705127);
}

#[test]
fn test_class_with_no_predicted_examples() {
	// The second class is never predicted, so its precision is 0 / 0. It must
	// surface as NaN and be excluded from the weighted precision, which makes
	// the weighted precision 0.5 rather than 0.25.
	let mut metrics = MulticlassClassificationMetrics::new(2);
	let labels = arr1(&[0, 0, 1, 1]);
	let predictions = arr1(&[0, 0, 0, 0]);
	metrics.update(MulticlassClassificationMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let metrics = metrics.finalize();
	insta::assert_debug_snapshot!(metrics, @r###"
 MulticlassClassificationMetricsOutput {
     class_metrics: [
         ClassMetrics {
             true_positives: 2,
             false_positives: 2,
             true_negatives: 0,
             false_negatives: 0,
             support: 2,
             precision: 0.5,
             recall: 1.0,
             f1_score: 0.6666667,
         },
         ClassMetrics {
             true_positives: 0,
             false_positives: 0,
             true_negatives: 2,
             false_negatives: 2,
             support: 2,
             precision: NaN,
             recall: 0.0,
             f1_score: 0.0,
         },
     ],
     accuracy: 0.5,
     precision_weighted: 0.5,
     recall_weighted: 0.5,
     f1_weighted: 0.33333334,
     balanced_accuracy: 0.5,
 }
 "###);
}

#[test]
fn test_class_with_no_true_examples() {
	// The second class never appears in the labels, so its recall is 0 / 0.
	// It is excluded from the weighted recall and from the balanced accuracy
	// rather than dragging them down as a zero.
	let mut metrics = MulticlassClassificationMetrics::new(2);
	let labels = arr1(&[0, 0, 0, 0]);
	let predictions = arr1(&[0, 0, 0, 1]);
	metrics.update(MulticlassClassificationMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let metrics = metrics.finalize();
	assert!(metrics.class_metrics[1].recall.is_nan());
	assert_eq!(metrics.class_metrics[1].precision, 0.0);
	assert_eq!(metrics.class_metrics[0].recall, 0.75);
	assert_eq!(metrics.recall_weighted, 0.75);
	assert_eq!(metrics.balanced_accuracy, 0.75);
	assert_eq!(metrics.precision_weighted, 1.0);
}

#[test]
fn test_disjoint_predictions_and_labels() {
	// Every class with a defined precision has zero support, so the weighted
	// precision falls back to the unweighted mean of the surviving values
	// rather than dividing by a zero weight sum.
	let mut metrics = MulticlassClassificationMetrics::new(2);
	let labels = arr1(&[0, 0]);
	let predictions = arr1(&[1, 1]);
	metrics.update(MulticlassClassificationMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let metrics = metrics.finalize();
	assert!(metrics.class_metrics[0].precision.is_nan());
	assert!(metrics.class_metrics[1].recall.is_nan());
	assert_eq!(metrics.accuracy, 0.0);
	assert_eq!(metrics.precision_weighted, 0.0);
	assert_eq!(metrics.recall_weighted, 0.0);
	assert_eq!(metrics.f1_weighted, 0.0);
	assert_eq!(metrics.balanced_accuracy, 0.0);
}

#[test]
fn test_merge() {
	let labels = arr1(&[0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 1, 2, 2, 1, 2, 2, 2, 2]);
	let predictions = arr1(&[0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2]);
	let mut one_shot = MulticlassClassificationMetrics::new(3);
	one_shot.update(MulticlassClassificationMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let mut chunked = MulticlassClassificationMetrics::new(3);
	let mut other = MulticlassClassificationMetrics::new(3);
	chunked.update(MulticlassClassificationMetricsInput {
		predictions: predictions.slice(s![0..10]),
		labels: labels.slice(s![0..10]),
	});
	other.update(MulticlassClassificationMetricsInput {
		predictions: predictions.slice(s![10..20]),
		labels: labels.slice(s![10..20]),
	});
	chunked.merge(other);
	let one_shot = one_shot.finalize();
	let chunked = chunked.finalize();
	assert_eq!(one_shot.accuracy, chunked.accuracy);
	assert_eq!(one_shot.precision_weighted, chunked.precision_weighted);
	assert_eq!(one_shot.recall_weighted, chunked.recall_weighted);
	assert_eq!(one_shot.f1_weighted, chunked.f1_weighted);
	assert_eq!(one_shot.balanced_accuracy, chunked.balanced_accuracy);
}

#[test]
fn test_empty() {
	let metrics = MulticlassClassificationMetrics::new(2).finalize();
	assert!(metrics.accuracy.is_nan());
	assert!(metrics.precision_weighted.is_nan());
	assert!(metrics.recall_weighted.is_nan());
	assert!(metrics.f1_weighted.is_nan());
	assert!(metrics.balanced_accuracy.is_nan());
}
