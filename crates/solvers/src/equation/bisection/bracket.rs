use thiserror::Error;

/// Errors that can occur when creating a [`Bracket`] or validating bounds.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BracketError {
    /// One or both endpoints are non-finite.
    #[error("non-finite endpoint(s)")]
    NonFinite,
    /// Endpoints are equal.
    #[error("zero width")]
    ZeroWidth,
    /// Residual signs at the endpoints agree.
    #[error("no sign change")]
    NoSignChange,
}

/// Current search interval and the residual sign at each end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    lower: f64,
    upper: f64,
    lower_sign: Sign,
    upper_sign: Sign,
}

impl Bracket {
    /// Creates a bracket whose endpoint residuals differ in sign.
    ///
    /// # Errors
    ///
    /// Returns `BracketError::NoSignChange` if both signs agree.
    pub(super) fn new(
        bounds: Bounds,
        lower_sign: Sign,
        upper_sign: Sign,
    ) -> Result<Self, BracketError> {
        if lower_sign == upper_sign {
            return Err(BracketError::NoSignChange);
        }
        Ok(Self {
            lower: bounds.lower,
            upper: bounds.upper,
            lower_sign,
            upper_sign,
        })
    }

    /// Returns `[lower, upper]`.
    #[must_use]
    pub fn as_array(&self) -> [f64; 2] {
        [self.lower, self.upper]
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Returns true if the interval is narrower than `abs + rel * |mid|`.
    #[must_use]
    pub fn is_x_converged(&self, x_abs_tol: f64, x_rel_tol: f64) -> bool {
        self.width() <= x_abs_tol + x_rel_tol * self.midpoint().abs()
    }

    /// Replaces the endpoint whose residual sign matches `sign`.
    pub(super) fn shrink(&mut self, x: f64, sign: Sign) {
        if sign == self.lower_sign {
            self.lower = x;
        } else {
            self.upper = x;
            self.upper_sign = sign;
        }
    }
}

/// Residual sign used to keep the root inside the bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Zero counts as positive.
    Positive,
    Negative,
}

impl Sign {
    #[must_use]
    pub fn of(value: f64) -> Self {
        if value < 0.0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

/// Finite, ordered endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Bounds {
    lower: f64,
    upper: f64,
}

impl Bounds {
    /// Orders the endpoints after checking they are finite and distinct.
    ///
    /// # Errors
    ///
    /// Returns `BracketError` if endpoints are non-finite or equal.
    pub(super) fn new([a, b]: [f64; 2]) -> Result<Self, BracketError> {
        if !(a.is_finite() && b.is_finite()) {
            return Err(BracketError::NonFinite);
        }
        #[allow(clippy::float_cmp)]
        if a == b {
            return Err(BracketError::ZeroWidth);
        }
        Ok(Self {
            lower: a.min(b),
            upper: a.max(b),
        })
    }

    pub(super) fn as_array(&self) -> [f64; 2] {
        [self.lower, self.upper]
    }
}
