mod content_store_port;
mod image_prefetch_port;

pub use content_store_port::ContentStorePort;
pub use image_prefetch_port::ImagePrefetchPort;

#[cfg(test)]
pub mod mocks {
    pub use super::content_store_port::MockContentStorePort;
    pub use super::image_prefetch_port::mock::MockPrefetcher;
}
