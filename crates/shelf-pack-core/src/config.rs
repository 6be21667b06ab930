use serde::{Deserialize, Serialize};

/// Width/height used when a dimension is unspecified or zero.
pub const DEFAULT_DIMENSION: u32 = 64;

/// Atlas construction options.
///
/// `auto_resize` is fixed for the lifetime of the atlas: when set, a request that
/// cannot be placed grows the atlas (doubling the smaller side first) and retries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShelfPackConfig {
    /// Initial atlas width in pixels.
    #[serde(default = "default_dimension", alias = "w")]
    pub width: u32,
    /// Initial atlas height in pixels.
    #[serde(default = "default_dimension", alias = "h")]
    pub height: u32,
    /// Grow the atlas instead of failing when a request does not fit.
    #[serde(default, alias = "autoResize")]
    pub auto_resize: bool,
}

impl Default for ShelfPackConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            auto_resize: false,
        }
    }
}

impl ShelfPackConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if either dimension is zero. `ShelfPack::new` is more lenient
    /// and substitutes the default dimension instead; use this when a zero is a
    /// caller mistake worth reporting.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ShelfPackError;

        if self.width == 0 || self.height == 0 {
            return Err(ShelfPackError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Returns a copy with zero dimensions replaced by [`DEFAULT_DIMENSION`].
    pub fn normalized(&self) -> Self {
        Self {
            width: non_zero_or_default(self.width),
            height: non_zero_or_default(self.height),
            auto_resize: self.auto_resize,
        }
    }
}

fn default_dimension() -> u32 {
    DEFAULT_DIMENSION
}

fn non_zero_or_default(v: u32) -> u32 {
    if v == 0 { DEFAULT_DIMENSION } else { v }
}

/// Builder for `ShelfPackConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct ShelfPackConfigBuilder {
    cfg: ShelfPackConfig,
}

impl ShelfPackConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: ShelfPackConfig::default(),
        }
    }
    pub fn with_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.width = w;
        self.cfg.height = h;
        self
    }
    pub fn auto_resize(mut self, v: bool) -> Self {
        self.cfg.auto_resize = v;
        self
    }
    pub fn build(self) -> ShelfPackConfig {
        self.cfg
    }
}

impl ShelfPackConfig {
    /// Create a fluent builder for `ShelfPackConfig`.
    pub fn builder() -> ShelfPackConfigBuilder {
        ShelfPackConfigBuilder::new()
    }
}
