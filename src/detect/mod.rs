mod backend;
mod backends;
pub mod labels;
mod registry;
mod result;

pub use backend::{DetectorBackend, FnLoader, ModelLoader};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::LoaderRegistry;
pub use result::{BoundingBox, DetectionResult, RawDetection};
