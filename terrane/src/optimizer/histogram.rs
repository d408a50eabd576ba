use std::fmt;

use crate::predicate::Op;

/// An equi-width histogram over one integer column. B buckets each span
/// width = (max - min + 1) / B values; values outside [min, max] are
/// dropped on insert. Space and insert time are constant in the number of
/// values seen.
#[derive(Debug, Clone)]
pub struct IntHistogram {
    buckets: Vec<usize>,
    min: i32,
    max: i32,
    width: f64,
    count: usize,
}

impl IntHistogram {
    pub fn new(buckets: usize, min: i32, max: i32) -> IntHistogram {
        assert!(buckets > 0, "a histogram needs at least one bucket");
        assert!(min <= max, "empty value range");
        IntHistogram {
            buckets: vec![0; buckets],
            min,
            max,
            width: (max as f64 - min as f64 + 1.0) / buckets as f64,
            count: 0,
        }
    }

    fn index(&self, v: i32) -> usize {
        let raw = ((v as f64 - self.min as f64) / self.width) as usize;
        raw.min(self.buckets.len() - 1)
    }

    pub fn add_value(&mut self, v: i32) {
        if v >= self.min && v <= self.max {
            let index = self.index(v);
            self.buckets[index] += 1;
            self.count += 1;
        }
    }

    /// Total values recorded. Always equals the sum of the buckets.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Estimated fraction of recorded values satisfying `value op v`,
    /// in [0, 1].
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> f64 {
        match op {
            Op::LessThan => {
                if v <= self.min {
                    0.0
                } else if v >= self.max {
                    1.0
                } else if self.count == 0 {
                    0.0
                } else {
                    let index = self.index(v);
                    let whole: usize = self.buckets[..index].iter().sum();
                    let bucket_start = self.min as f64 + index as f64 * self.width;
                    let partial =
                        self.buckets[index] as f64 / self.width * (v as f64 - bucket_start);
                    (whole as f64 + partial) / self.count as f64
                }
            }
            Op::GreaterThan => 1.0 - self.estimate_selectivity(Op::LessThanOrEq, v),
            Op::Equals => {
                self.estimate_selectivity(Op::LessThanOrEq, v)
                    - self.estimate_selectivity(Op::LessThan, v)
            }
            Op::NotEquals => 1.0 - self.estimate_selectivity(Op::Equals, v),
            Op::GreaterThanOrEq => self.estimate_selectivity(Op::GreaterThan, v.saturating_sub(1)),
            Op::LessThanOrEq => self.estimate_selectivity(Op::LessThan, v.saturating_add(1)),
        }
    }

    /// Mean per-bucket selectivity.
    pub fn avg_selectivity(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .buckets
            .iter()
            .map(|b| *b as f64 / self.count as f64)
            .sum();
        sum / self.buckets.len() as f64
    }
}

impl fmt::Display for IntHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IntHistogram {{ min: {}, max: {}, width: {}, count: {}, buckets: {:?} }}",
            self.min, self.max, self.width, self.count, self.buckets
        )
    }
}

/// Highest string code: "zzzz" packed big-endian.
const MAX_STRING_CODE: i32 = 0x7a7a_7a7a;

/// A histogram over a string column, reduced to integers by a monotone
/// mapping: the first four bytes of the string packed big-endian (earlier
/// byte more significant, missing bytes zero), clamped to the code range of
/// "" through "zzzz". The mapping is order-preserving over ASCII strings;
/// bytes above 'z' clamp into the top bucket.
#[derive(Debug, Clone)]
pub struct StringHistogram {
    hist: IntHistogram,
}

impl StringHistogram {
    pub fn new(buckets: usize) -> StringHistogram {
        StringHistogram {
            hist: IntHistogram::new(buckets, 0, MAX_STRING_CODE),
        }
    }

    /// The integer code a string maps to.
    pub fn string_to_code(s: &str) -> i32 {
        let bytes = s.as_bytes();
        let mut code: i64 = 0;
        for i in 0..4 {
            code = (code << 8) | i64::from(bytes.get(i).copied().unwrap_or(0));
        }
        code.clamp(0, MAX_STRING_CODE as i64) as i32
    }

    pub fn add_value(&mut self, s: &str) {
        self.hist.add_value(Self::string_to_code(s));
    }

    pub fn count(&self) -> usize {
        self.hist.count()
    }

    pub fn estimate_selectivity(&self, op: Op, s: &str) -> f64 {
        self.hist.estimate_selectivity(op, Self::string_to_code(s))
    }

    pub fn avg_selectivity(&self) -> f64 {
        self.hist.avg_selectivity()
    }
}
