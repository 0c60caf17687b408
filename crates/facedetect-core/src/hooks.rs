//! User extension hooks and post-detection method binding.

use crate::error::ConfigurationError;
use crate::record::Detections;
use crate::settings::{Mode, Settings, METHOD_DETECT, METHOD_RECOGNIZE};
use crate::types::LandmarkSet;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct HookError(pub String);

/// Read-only view of one processed frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub index: u64,
    pub mode: Mode,
    pub frame: &'a RgbImage,
    pub detections: Option<&'a Detections>,
    pub landmarks: &'a [LandmarkSet],
}

/// A per-frame extension callback.
pub trait FrameHook {
    fn on_frame(&mut self, view: &FrameView<'_>) -> Result<(), HookError>;
}

impl<F> FrameHook for F
where
    F: FnMut(&FrameView<'_>) -> Result<(), HookError>,
{
    fn on_frame(&mut self, view: &FrameView<'_>) -> Result<(), HookError> {
        self(view)
    }
}

/// Handle to a registered hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId(usize);

/// Named extension hooks. Names are matched case-insensitively.
#[derive(Default)]
pub struct Extensions {
    hooks: Vec<(String, Box<dyn FrameHook>)>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` under `name`, replacing any previous hook of that name.
    pub fn register(mut self, name: &str, hook: impl FrameHook + 'static) -> Self {
        let name = name.trim().to_lowercase();
        self.hooks.retain(|(n, _)| *n != name);
        self.hooks.push((name, Box::new(hook)));
        self
    }

    pub fn lookup(&self, name: &str) -> Option<HookId> {
        self.hooks.iter().position(|(n, _)| n == name).map(HookId)
    }

    pub fn name(&self, id: HookId) -> &str {
        &self.hooks[id.0].0
    }

    pub fn call(&mut self, id: HookId, view: &FrameView<'_>) -> Result<(), HookError> {
        self.hooks[id.0].1.on_frame(view)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|(n, _)| n))
            .finish()
    }
}

/// The post-detection action, bound once before any frame is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Detect,
    Recognize,
    Custom(HookId),
}

impl Method {
    /// Resolve `settings.method` against the built-ins or, with `custom`, the extensions.
    pub fn bind(settings: &Settings, extensions: &Extensions) -> Result<Self, ConfigurationError> {
        let name = settings.method.as_str();
        if settings.custom {
            return extensions
                .lookup(name)
                .map(Method::Custom)
                .ok_or_else(|| ConfigurationError::UnknownHook(name.to_string()));
        }
        match name {
            METHOD_DETECT => Ok(Method::Detect),
            METHOD_RECOGNIZE => Ok(Method::Recognize),
            other => Err(ConfigurationError::UnknownMethod(other.to_string())),
        }
    }

    pub fn recognizes(&self) -> bool {
        matches!(self, Method::Recognize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &FrameView<'_>) -> Result<(), HookError> {
        Ok(())
    }

    #[test]
    fn test_bind_builtins() {
        let ext = Extensions::new();
        assert_eq!(Method::bind(&Settings::default(), &ext).unwrap(), Method::Detect);
        let settings = Settings::default().with_method("recognize");
        assert_eq!(Method::bind(&settings, &ext).unwrap(), Method::Recognize);
        assert!(Method::Recognize.recognizes());
    }

    #[test]
    fn test_bind_unknown_builtin() {
        let settings = Settings::default().with_method("main");
        let err = Method::bind(&settings, &Extensions::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownMethod(ref m) if m == "main"));
    }

    #[test]
    fn test_bind_custom_hook() {
        let ext = Extensions::new().register("Main", noop);
        let settings = Settings::default().with_custom(true).with_method("main");
        let method = Method::bind(&settings, &ext).unwrap();
        let Method::Custom(id) = method else {
            panic!("expected custom method, got {method:?}");
        };
        assert_eq!(ext.name(id), "main");
    }

    #[test]
    fn test_bind_custom_missing() {
        let settings = Settings::default().with_custom(true).with_method("detect");
        let err = Method::bind(&settings, &Extensions::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownHook(_)));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let ext = Extensions::new().register("a", noop).register("A", noop);
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn test_call_closure_hook() {
        let mut seen = Vec::new();
        let image = RgbImage::new(2, 2);
        {
            let mut hook = |view: &FrameView<'_>| -> Result<(), HookError> {
                seen.push(view.index);
                Ok(())
            };
            let view = FrameView {
                index: 7,
                mode: Mode::Image,
                frame: &image,
                detections: None,
                landmarks: &[],
            };
            hook.on_frame(&view).unwrap();
        }
        assert_eq!(seen, vec![7]);
    }
}
