use thiserror::Error;

/// Errors raised while reading a value back out of a bit buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The buffer ended before the value was complete
    #[error("Unexpected end of buffer after {bits_read} bits")]
    UnexpectedEnd { bits_read: u32 },

    /// A variable-length integer did not terminate within 64 bits
    #[error("Variable integer exceeds 64 bits")]
    IntegerOverflow,

    /// A string payload was not valid UTF-8
    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,

    /// A decoded value does not fit the target type
    #[error("Value {value} out of range for {type_name}")]
    OutOfRange { type_name: &'static str, value: i128 },
}
