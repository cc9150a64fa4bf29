mod error;
mod paths;
mod record;
mod store;

pub use error::TokenStoreError;
pub use paths::{credential_path, CREDENTIAL_DIR};
pub use record::CredentialRecord;
pub use store::TokenStore;
