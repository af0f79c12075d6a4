mod auth;
mod cipher;
mod file;
mod memory;
mod store;

pub use auth::TokenManager;
pub use cipher::TokenCipher;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::AuditStore;
pub use store::CredentialStore;
pub use store::PreferenceStore;
