use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};

/// largest magnitude an integer may have and still convert to f32 without rounding
pub const F32_EXACT_INT_LIMIT: i32 = 1 << 24;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("lower bound {low} is greater than upper bound {high}")]
    Inverted { low: i32, high: i32 },
    #[error("bound {0} cannot be represented exactly as a 32 bit float (limit is +/-16777216)")]
    NotExact(i32),
}

/// Where the value of each reading comes from
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// the same value, every time
    Constant(f32),
    /// an integer drawn uniformly from `low..=high`, widened to f32
    Uniform {
        low: i32,
        high: i32,
        dist: Uniform<i32>,
    },
}

impl ValueSource {
    pub fn constant(value: f32) -> Self {
        Self::Constant(value)
    }

    pub fn uniform(low: i32, high: i32) -> Result<Self, RangeError> {
        if low > high {
            return Err(RangeError::Inverted { low, high });
        }
        for bound in [low, high] {
            if bound.unsigned_abs() > F32_EXACT_INT_LIMIT.unsigned_abs() {
                return Err(RangeError::NotExact(bound));
            }
        }
        Ok(Self::Uniform {
            low,
            high,
            dist: Uniform::new_inclusive(low, high),
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::Uniform { dist, .. } => dist.sample(rng) as f32,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Constant(value) => format!("constant {value}"),
            Self::Uniform { low, high, .. } => format!("uniform random in [{low}, {high}]"),
        }
    }
}
