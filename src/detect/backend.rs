use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// A loaded object-detection model.
///
/// Implementations treat the frame as read-only and must not keep pixel data
/// beyond the `detect` call. Result order is whatever the model reports.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, run once right after loading.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: DetectorBackend + ?Sized> DetectorBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}

/// Produces a `DetectorBackend`. Loading may be slow (model files, graph
/// optimization) and runs on a blocking worker, so `detect` is never called
/// before `load` has completed.
pub trait ModelLoader: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Result<Box<dyn DetectorBackend>>;
}

/// Adapts a closure into a `ModelLoader`.
pub struct FnLoader<F> {
    name: String,
    load: F,
}

impl<F> FnLoader<F>
where
    F: Fn() -> Result<Box<dyn DetectorBackend>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, load: F) -> Self {
        Self {
            name: name.into(),
            load,
        }
    }
}

impl<F> ModelLoader for FnLoader<F>
where
    F: Fn() -> Result<Box<dyn DetectorBackend>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Box<dyn DetectorBackend>> {
        (self.load)()
    }
}
