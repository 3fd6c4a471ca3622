use serde::{Deserialize, Serialize};

use crate::TempoError;

/// Two candidate tempi in the MIREX convention.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MirexEstimate {
    /// Slower candidate in beats per minute.
    pub t1: f32,
    /// Faster candidate in beats per minute.
    pub t2: f32,
    /// Confidence of `t1`. `t2` carries the remainder.
    pub s1: f32,
}

impl MirexEstimate {
    pub fn new(t1: f32, t2: f32, s1: f32) -> Result<Self, TempoError> {
        if !t1.is_finite() || !t2.is_finite() || t1 < 0.0 || t2 < 0.0 {
            return Err(TempoError::estimation(format!(
                "tempo candidates must be finite and non-negative, got {t1} and {t2}"
            )));
        }
        if !(0.0..=1.0).contains(&s1) {
            return Err(TempoError::estimation(format!(
                "confidence must be between 0 and 1, got {s1}"
            )));
        }
        Ok(Self { t1, t2, s1 })
    }

    pub fn s2(&self) -> f32 {
        1.0 - self.s1
    }

    /// Orders the candidates so that `t1 <= t2`, carrying the confidence along.
    pub fn ordered(self) -> Self {
        if self.t1 > self.t2 {
            Self {
                t1: self.t2,
                t2: self.t1,
                s1: self.s2(),
            }
        } else {
            self
        }
    }
}

/// What one input file produced.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum TempoResult {
    Single(f32),
    Mirex(MirexEstimate),
}
