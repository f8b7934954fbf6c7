use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one InSPIRE experimental configuration.
///
/// Each setup is published as its own zarr store in the OEDI data lake, named
/// after the zero-padded setup number (setup 1 lives in `preliminary_01.zarr`).
/// The published range is 1 through 10, but the identifier is not validated
/// here; requesting a setup that does not exist fails when the store is opened.
///
/// # Examples
///
/// ```
/// use inspire_oedi::Setup;
///
/// let setup = Setup::new(3);
/// assert_eq!(setup.number(), 3);
/// assert_eq!(setup.store_name(), "preliminary_03.zarr");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Setup(u8);

impl Setup {
    pub const fn new(number: u8) -> Self {
        Setup(number)
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    /// Object key of the zarr store for this setup, relative to the data prefix.
    pub fn store_name(self) -> String {
        format!("preliminary_{:02}.zarr", self.0)
    }
}

impl From<u8> for Setup {
    fn from(number: u8) -> Self {
        Setup(number)
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_name_is_zero_padded() {
        assert_eq!(Setup::new(1).store_name(), "preliminary_01.zarr");
        assert_eq!(Setup::new(10).store_name(), "preliminary_10.zarr");
    }
}
