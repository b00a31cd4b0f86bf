//! Tunables shared by the engine and its binaries.

use crate::paginate::{DEFAULT_PAGE_SIZE, DEFAULT_WRAP_WIDTH};
use crate::tokenizer::TokenizerConfig;
use crate::{EngineError, Result};

pub const DEFAULT_MAX_RESULTS: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Interactive reading settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Lines per page.
    pub page_size: usize,
    /// Column at which article text is wrapped before paging.
    pub wrap_width: usize,
    /// Default cap on search results.
    pub max_results: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, wrap_width: DEFAULT_WRAP_WIDTH, max_results: DEFAULT_MAX_RESULTS }
    }
}

impl ReaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(EngineError::constraint("page_size must be positive"));
        }
        if self.wrap_width == 0 {
            return Err(EngineError::constraint("wrap_width must be positive"));
        }
        if self.max_results == 0 {
            return Err(EngineError::constraint("max_results must be positive"));
        }
        Ok(())
    }
}

/// Full-text index build settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub batch_size: usize,
    /// Continue from the last committed batch instead of starting over.
    pub resume: bool,
    pub tokenizer: TokenizerConfig,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, resume: true, tokenizer: TokenizerConfig::default() }
    }
}

impl BuildOptions {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EngineError::constraint("batch_size must be positive"));
        }
        if self.tokenizer.min_len == 0 {
            return Err(EngineError::constraint("minimum token length must be positive"));
        }
        Ok(())
    }
}
