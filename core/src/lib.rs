pub mod annotate;
pub mod config;
pub mod driver;
pub mod error;
pub mod inspector;
pub mod page;
pub mod pipeline;
pub mod profile;

// Re-exports for convenience
pub use annotate::{annotate, escape_html, Annotator};
pub use config::Config;
pub use driver::{Collected, SessionDriver};
pub use error::{Result, TypelensError};
pub use inspector::{InspectorSession, WebSocketSession};
pub use pipeline::{collect_and_annotate, Annotation, Typelens};
pub use profile::{LogMessage, ScriptTypeProfile, TypeObject, TypeSample};
