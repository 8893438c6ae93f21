//! Bridge configuration surface.

use crate::codec::{Base64Codec, UpdateCodec};
use crate::dispatch::{DispatchPolicy, RateLimited};
use dsb_core::Origin;
use std::sync::Arc;

/// Description string attached to outbound updates by default.
pub const DEFAULT_UPDATE_DESCR: &str = "Document updated";

/// Configuration for an [`UpdateBridge`](crate::bridge::UpdateBridge).
#[derive(Clone)]
pub struct BridgeConfig {
    /// The origin the bridge tags replayed applications with and filters out
    /// of capture. Exactly one reserved value per document.
    pub reserved_origin: Origin,
    /// Payload codec.
    pub codec: Arc<dyn UpdateCodec>,
    /// Flush scheduling strategy.
    pub dispatch: Arc<dyn DispatchPolicy>,
    /// Human-readable description attached to outbound updates.
    pub update_descr: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reserved_origin: Origin::Replay,
            codec: Arc::new(Base64Codec),
            dispatch: Arc::new(RateLimited::default()),
            update_descr: DEFAULT_UPDATE_DESCR.to_string(),
        }
    }
}

/// Builder for bridge configuration.
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
        }
    }

    pub fn reserved_origin(mut self, origin: Origin) -> Self {
        self.config.reserved_origin = origin;
        self
    }

    pub fn codec(mut self, codec: impl UpdateCodec) -> Self {
        self.config.codec = Arc::new(codec);
        self
    }

    pub fn dispatch(mut self, dispatch: impl DispatchPolicy) -> Self {
        self.config.dispatch = Arc::new(dispatch);
        self
    }

    pub fn update_descr(mut self, descr: impl Into<String>) -> Self {
        self.config.update_descr = descr.into();
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

impl Default for BridgeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
