//! Domain types.

mod key;
mod passphrase;

pub use key::{KeyIdentity, KeyInfo, KeyParams, KeyType, KeyUsage};
pub use passphrase::Passphrase;
