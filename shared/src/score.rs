/// Outcome of reading a numeric score out of expanded placeholder text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreValue {
    /// The text was a plain integer
    Integer(i32),
    /// The text was a decimal number and got rounded, losing precision
    Rounded(i32),
    /// The text was not a number at all and defaults to zero
    Invalid,
}

impl ScoreValue {
    pub fn value(&self) -> i32 {
        match self {
            ScoreValue::Integer(value) | ScoreValue::Rounded(value) => *value,
            ScoreValue::Invalid => 0,
        }
    }
}

/// Parses a score as an integer first, then as a float rounded to the
/// nearest integer, and finally falls back to zero.
pub fn parse_score(text: &str) -> ScoreValue {
    if let Ok(value) = text.parse::<i32>() {
        return ScoreValue::Integer(value);
    }
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => ScoreValue::Rounded(round_half_up(value)),
        _ => ScoreValue::Invalid,
    }
}

// halves round towards positive infinity; `as` saturates out of range values
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
