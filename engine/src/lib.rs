pub mod config;
pub mod document;
pub mod dom;
pub mod layout;
pub mod net;
pub mod parser;
pub mod rewriter;
pub mod style;

pub use config::{ConfigFileError, LayoutSection, SizeproxyConfig};
pub use document::LiveDocument;
pub use dom::{Dom, DomError, NodeId};
pub use layout::{ImageProbe, LayoutConfig, LayoutEngine, NoProbe};
pub use net::{
    load_document, CachedProbe, FileProbe, LoadError, LoadedDocument, NetworkConfig,
};
pub use rewriter::{
    ConfigError, DocumentHost, ElementOutcome, ElementPlan, HostError, ProxyUrl, ProxyUrlError,
    RewriteError, RewriteReport, Rewriter, RewriterConfig,
};
