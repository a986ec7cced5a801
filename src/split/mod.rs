//! Train/test/valid partitioning of annotated images.
//!
//! The set is shuffled, bucket sizes are computed from percentage ratios by
//! flooring, the rounding remainder goes to train, and every bucket with a
//! non-zero ratio gets at least one item when there are enough items. The
//! shuffled sequence is then cut into three contiguous slices.

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BoxmarkError;

/// One of the three export partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Train,
    Test,
    Valid,
}

impl Bucket {
    /// All buckets, in slicing order.
    pub const ALL: [Bucket; 3] = [Bucket::Train, Bucket::Test, Bucket::Valid];

    /// Name of the bucket's output folder.
    pub fn dir_name(self) -> &'static str {
        match self {
            Bucket::Train => "train",
            Bucket::Test => "test",
            Bucket::Valid => "valid",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Bucket sizes as percentages of the whole set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    #[serde(rename = "trainPercentage")]
    pub train: f64,
    #[serde(rename = "testPercentage")]
    pub test: f64,
    #[serde(rename = "validPercentage")]
    pub valid: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 80.0,
            test: 10.0,
            valid: 10.0,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, test: f64, valid: f64) -> Self {
        Self { train, test, valid }
    }

    /// The percentage for one bucket.
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Train => self.train,
            Bucket::Test => self.test,
            Bucket::Valid => self.valid,
        }
    }

    /// Checks the ratios are finite, non-negative and sum to 100.
    pub fn validate(&self) -> Result<(), BoxmarkError> {
        let parts = [self.train, self.test, self.valid];
        if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(BoxmarkError::InvalidSplitRatios {
                message: format!(
                    "percentages must be non-negative numbers (got {}/{}/{})",
                    self.train, self.test, self.valid
                ),
            });
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 100.0).abs() > 1e-6 {
            return Err(BoxmarkError::InvalidSplitRatios {
                message: format!("percentages must sum to 100 (got {})", sum),
            });
        }
        Ok(())
    }
}

/// Number of items assigned to each bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: usize,
    pub test: usize,
    pub valid: usize,
}

impl SplitCounts {
    /// The count for one bucket.
    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Train => self.train,
            Bucket::Test => self.test,
            Bucket::Valid => self.valid,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut usize {
        match bucket {
            Bucket::Train => &mut self.train,
            Bucket::Test => &mut self.test,
            Bucket::Valid => &mut self.valid,
        }
    }

    /// Sum over all buckets.
    pub fn total(&self) -> usize {
        self.train + self.test + self.valid
    }
}

/// Computes bucket sizes for `total` items.
///
/// The counts always sum to `total`. For small sets the minimum-of-one rule
/// takes priority over ratio accuracy: three items split 80/10/10 become
/// 1/1/1. Buckets with a zero ratio stay empty.
pub fn split_counts(total: usize, ratios: &SplitRatios) -> SplitCounts {
    let floor = |pct: f64| (total as f64 * pct / 100.0).floor() as usize;
    let mut counts = SplitCounts {
        train: floor(ratios.train),
        test: floor(ratios.test),
        valid: floor(ratios.valid),
    };

    // Floating-point ratios can overshoot by one on exact multiples.
    while counts.total() > total {
        let largest = Bucket::ALL
            .into_iter()
            .max_by_key(|b| counts.get(*b))
            .unwrap_or(Bucket::Train);
        *counts.get_mut(largest) -= 1;
    }

    counts.train += total - counts.total();

    // Bucket i (in slicing order) is guaranteed an item once there are at
    // least i + 1 items; the item is taken from the largest bucket.
    for (i, bucket) in Bucket::ALL.into_iter().enumerate() {
        if counts.get(bucket) > 0 || ratios.get(bucket) <= 0.0 || total <= i {
            continue;
        }
        let donor = Bucket::ALL
            .into_iter()
            .filter(|b| *b != bucket && counts.get(*b) > 1)
            .max_by_key(|b| counts.get(*b));
        if let Some(donor) = donor {
            *counts.get_mut(donor) -= 1;
            *counts.get_mut(bucket) += 1;
        }
    }

    counts
}

/// Options for partitioning.
#[derive(Clone, Debug, Default)]
pub struct SplitOptions {
    pub ratios: SplitRatios,
    /// Fixed shuffle seed; `None` shuffles from OS entropy.
    pub seed: Option<u64>,
}

/// Three disjoint buckets covering the input exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
    pub valid: Vec<T>,
}

impl<T> Partition<T> {
    /// The items of one bucket.
    pub fn bucket(&self, bucket: Bucket) -> &[T] {
        match bucket {
            Bucket::Train => &self.train,
            Bucket::Test => &self.test,
            Bucket::Valid => &self.valid,
        }
    }

    /// Bucket sizes.
    pub fn counts(&self) -> SplitCounts {
        SplitCounts {
            train: self.train.len(),
            test: self.test.len(),
            valid: self.valid.len(),
        }
    }

    /// Consumes the partition, yielding each bucket with its items.
    pub fn into_buckets(self) -> [(Bucket, Vec<T>); 3] {
        [
            (Bucket::Train, self.train),
            (Bucket::Test, self.test),
            (Bucket::Valid, self.valid),
        ]
    }
}

/// Shuffles `items` and cuts them into train/test/valid.
pub fn partition<T>(items: Vec<T>, opts: &SplitOptions) -> Result<Partition<T>, BoxmarkError> {
    if let Some(seed) = opts.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        partition_with_rng(items, &opts.ratios, &mut rng)
    } else {
        let mut rng = rand::rng();
        partition_with_rng(items, &opts.ratios, &mut rng)
    }
}

/// Like [`partition`], drawing the shuffle from `rng`.
pub fn partition_with_rng<T, R: Rng + ?Sized>(
    mut items: Vec<T>,
    ratios: &SplitRatios,
    rng: &mut R,
) -> Result<Partition<T>, BoxmarkError> {
    ratios.validate()?;
    items.shuffle(rng);

    let counts = split_counts(items.len(), ratios);
    let valid = items.split_off(counts.train + counts.test);
    let test = items.split_off(counts.train);

    Ok(Partition {
        train: items,
        test,
        valid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_default_ratios() {
        let counts = split_counts(100, &SplitRatios::default());
        assert_eq!(
            counts,
            SplitCounts {
                train: 80,
                test: 10,
                valid: 10
            }
        );
    }

    #[test]
    fn remainder_goes_to_train() {
        let counts = split_counts(17, &SplitRatios::new(70.0, 15.0, 15.0));
        // floor: 11 / 2 / 2, remainder 2
        assert_eq!(
            counts,
            SplitCounts {
                train: 13,
                test: 2,
                valid: 2
            }
        );
    }

    #[test]
    fn small_sets_get_one_per_bucket() {
        let r = SplitRatios::default();
        assert_eq!(split_counts(0, &r).total(), 0);
        assert_eq!(
            split_counts(1, &r),
            SplitCounts {
                train: 1,
                test: 0,
                valid: 0
            }
        );
        assert_eq!(
            split_counts(2, &r),
            SplitCounts {
                train: 1,
                test: 1,
                valid: 0
            }
        );
        assert_eq!(
            split_counts(3, &r),
            SplitCounts {
                train: 1,
                test: 1,
                valid: 1
            }
        );
        assert_eq!(
            split_counts(5, &r),
            SplitCounts {
                train: 3,
                test: 1,
                valid: 1
            }
        );
    }

    #[test]
    fn zero_ratio_bucket_stays_empty() {
        let counts = split_counts(10, &SplitRatios::new(100.0, 0.0, 0.0));
        assert_eq!(counts.train, 10);
        assert_eq!(counts.test, 0);
        assert_eq!(counts.valid, 0);
    }

    #[test]
    fn ratios_must_sum_to_hundred() {
        assert!(SplitRatios::new(80.0, 10.0, 5.0).validate().is_err());
        assert!(SplitRatios::new(110.0, -5.0, -5.0).validate().is_err());
        assert!(SplitRatios::new(f64::NAN, 50.0, 50.0).validate().is_err());
        assert!(SplitRatios::new(70.0, 15.0, 15.0).validate().is_ok());
    }

    #[test]
    fn partition_is_disjoint_and_complete() {
        let items: Vec<u32> = (0..25).collect();
        let opts = SplitOptions {
            ratios: SplitRatios::default(),
            seed: Some(42),
        };
        let part = partition(items, &opts).expect("partition");
        assert_eq!(part.counts().total(), 25);

        let mut all: Vec<u32> = Bucket::ALL
            .iter()
            .flat_map(|b| part.bucket(*b).iter().copied())
            .collect();
        all.sort();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_partition_is_deterministic() {
        let opts = SplitOptions {
            ratios: SplitRatios::default(),
            seed: Some(7),
        };
        let a = partition((0..30).collect::<Vec<u32>>(), &opts).expect("a");
        let b = partition((0..30).collect::<Vec<u32>>(), &opts).expect("b");
        assert_eq!(a, b);
    }

    #[test]
    fn ratios_serialize_as_percentages() {
        let json = serde_json::to_string(&SplitRatios::default()).expect("serialize");
        assert_eq!(
            json,
            r#"{"trainPercentage":80.0,"testPercentage":10.0,"validPercentage":10.0}"#
        );
    }
}
