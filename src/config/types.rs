use flvkit_media::{UnderflowPolicy, WriterOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub writer: WriterConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReaderConfig {
    /// Reject tags whose trailing back-pointer disagrees with their size
    #[serde(default)]
    pub strict_back_pointer: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WriterConfig {
    /// Handling of timestamps earlier than the first tag ("clamp" or "wrap")
    #[serde(default)]
    pub underflow: UnderflowPolicy,

    /// Tags between duration checkpoints (0 = only when closing)
    #[serde(default)]
    pub sync_every: u32,
}

impl WriterConfig {
    pub fn options(&self) -> WriterOptions {
        WriterOptions {
            underflow: self.underflow,
        }
    }
}
