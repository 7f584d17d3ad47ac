// Gateway module for storage - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod blob;
mod document;
mod firestore;

// Public re-exports - the ONLY way to access storage functionality
pub use blob::{audio_object_key, BlobStore, FirebaseBlobStore, LocalBlobStore};
#[cfg(test)]
pub use blob::MockBlobStore;
pub use document::{DocumentStore, FileDocumentStore, MemoryDocumentStore, VERSION_FIELD};
#[cfg(test)]
pub use document::MockDocumentStore;
pub use firestore::FirestoreDocumentStore;
