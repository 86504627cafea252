use super::StreamingMetric;
use num_traits::ToPrimitive;

/// The streaming mean of a sequence of `f32`s. The sum is accumulated as an `f64` so that long sequences do not lose precision.
#[derive(Clone, Debug, Default)]
pub struct Mean {
	n: u64,
	sum: f64,
}

impl Mean {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Mean {
	type Input = f32;
	type Output = Option<f32>;

	fn update(&mut self, input: Self::Input) {
		self.n += 1;
		self.sum += input.to_f64().unwrap();
	}

	fn merge(&mut self, other: Self) {
		self.n += other.n;
		self.sum += other.sum;
	}

	fn finalize(self) -> Option<f32> {
		if self.n == 0 {
			None
		} else {
			Some((self.sum / self.n.to_f64().unwrap()).to_f32().unwrap())
		}
	}
}

#[test]
fn test_mean() {
	let mut mean = Mean::new();
	for input in &[1.0, 2.0, 3.0, 4.0] {
		mean.update(*input);
	}
	assert_eq!(mean.finalize(), Some(2.5));
}

#[test]
fn test_mean_empty() {
	assert_eq!(Mean::new().finalize(), None);
}

#[test]
fn test_mean_merge() {
	let mut a = Mean::new();
	a.update(1.0);
	a.update(2.0);
	let mut b = Mean::new();
	b.update(7.0);
	a.merge(b);
	assert_eq!(a.finalize(), Some(10.0 / 3.0));
}
