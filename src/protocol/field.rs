use std::fmt::Write;
use std::str::SplitWhitespace;

/// Why a line could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty message")]
    Empty,

    #[error("unknown message code `{0}`")]
    UnknownCode(String),

    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("bad value `{token}` for field `{field}`")]
    BadField { field: &'static str, token: String },

    #[error("{count} unexpected trailing token(s)")]
    TrailingTokens { count: usize },
}

/// An outgoing line: the message code followed by space separated tokens.
pub struct Line(String);

impl Line {
    pub fn new(code: &str) -> Self {
        Line(code.to_string())
    }

    pub fn push(&mut self, token: impl std::fmt::Display) {
        // Writing into a String cannot fail.
        let _ = write!(self.0, " {token}");
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Incoming tokens, consumed in field order.
pub struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    pub fn new(line: &'a str) -> Self {
        Tokens {
            inner: line.split_whitespace(),
        }
    }

    /// The leading message code.
    pub fn code(&mut self) -> Result<&'a str, DecodeError> {
        self.inner.next().ok_or(DecodeError::Empty)
    }

    pub fn next(&mut self, field: &'static str) -> Result<&'a str, DecodeError> {
        self.inner.next().ok_or(DecodeError::MissingField { field })
    }

    /// Fails if any token is left over.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.inner.count() {
            0 => Ok(()),
            count => Err(DecodeError::TrailingTokens { count }),
        }
    }
}

/// A value that can be written to and read back from a message line.
pub trait Field: Sized {
    fn encode(&self, line: &mut Line);

    fn decode(tokens: &mut Tokens<'_>, field: &'static str) -> Result<Self, DecodeError>;
}

/// Strings are sent raw as a single token: they must be non-empty and free
/// of whitespace.
impl Field for String {
    fn encode(&self, line: &mut Line) {
        debug_assert!(
            !self.is_empty() && !self.contains(char::is_whitespace),
            "`{self}` is not a single token"
        );
        line.push(self);
    }

    fn decode(tokens: &mut Tokens<'_>, field: &'static str) -> Result<Self, DecodeError> {
        tokens.next(field).map(str::to_string)
    }
}

impl Field for bool {
    fn encode(&self, line: &mut Line) {
        line.push(if *self { '1' } else { '0' });
    }

    fn decode(tokens: &mut Tokens<'_>, field: &'static str) -> Result<Self, DecodeError> {
        match tokens.next(field)? {
            "0" => Ok(false),
            "1" => Ok(true),
            token => Err(DecodeError::BadField {
                field,
                token: token.to_string(),
            }),
        }
    }
}

/// Unsigned integers are sent as exactly `bits / 4` zero padded hex digits.
/// Shorter tokens are accepted on input.
macro_rules! hex_field {
    ($($ty:ty),*) => {$(
        impl Field for $ty {
            fn encode(&self, line: &mut Line) {
                line.push(format_args!("{:0width$x}", self, width = <$ty>::BITS as usize / 4));
            }

            fn decode(tokens: &mut Tokens<'_>, field: &'static str) -> Result<Self, DecodeError> {
                let token = tokens.next(field)?;
                let bad = || DecodeError::BadField {
                    field,
                    token: token.to_string(),
                };

                if token.len() > <$ty>::BITS as usize / 4
                    || !token.bytes().all(|b| b.is_ascii_hexdigit())
                {
                    return Err(bad());
                }
                <$ty>::from_str_radix(token, 16).map_err(|_| bad())
            }
        }
    )*};
}

hex_field!(u8, u16, u32, u64);

/// Fixed-length arrays carry no length prefix.
impl<T: Field, const N: usize> Field for [T; N] {
    fn encode(&self, line: &mut Line) {
        for item in self {
            item.encode(line);
        }
    }

    fn decode(tokens: &mut Tokens<'_>, field: &'static str) -> Result<Self, DecodeError> {
        let items = (0..N)
            .map(|_| T::decode(tokens, field))
            .collect::<Result<Vec<T>, _>>()?;

        match items.try_into() {
            Ok(array) => Ok(array),
            Err(_) => Err(DecodeError::MissingField { field }),
        }
    }
}

/// Lists are prefixed with their length as a `u32`.
impl<T: Field> Field for Vec<T> {
    fn encode(&self, line: &mut Line) {
        (self.len() as u32).encode(line);
        for item in self {
            item.encode(line);
        }
    }

    fn decode(tokens: &mut Tokens<'_>, field: &'static str) -> Result<Self, DecodeError> {
        let count = u32::decode(tokens, field)? as usize;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(T::decode(tokens, field)?);
        }
        Ok(items)
    }
}
