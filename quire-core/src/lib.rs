pub mod assemble;
pub mod build;
pub mod config;
pub mod dates;
pub mod emit;
pub mod loader;
pub mod model;
pub mod postprocess;
pub mod shortcode;
pub mod template;
pub mod transform;

// Re-export main types
pub use assemble::{AssembleError, AssembleReport, Assembler};
pub use build::{BuildError, BuildOptions, BuildSummary, build_site};
pub use config::{BuildSettings, Config, ConfigError, SiteConfig};
pub use loader::{LoadError, load};
pub use model::{Author, Category, MediaItem, Page, PageKind, SiteData, UrlFormat};
pub use shortcode::{Shortcode, ShortcodeRegistry};
pub use template::{EngineKind, TemplateError, TemplateSet};
pub use transform::ContentRenderer;
