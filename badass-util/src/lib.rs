//! Small shared traits. `EnumFromStr` backs `#[derive(EnumFromStr)]` in
//! `badass-util-derive`, used to parse CLI flags like `--cpu 65c02` into
//! typed enums without a hand-written `match` per flag.

use std::error::Error;
use std::fmt;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to parse \"{}\" as {}", &self.value, &self.enum_name)
    }
}

impl Error for ParseEnumError {}

pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}
