pub mod discovery;
pub mod locality;

pub use discovery::{AddressSource, FixedAddresses, OwnAddressSet, SystemAddresses};
pub use locality::{is_local, ASSUME_LOCAL_WHEN_NO_ADDRESSES};
