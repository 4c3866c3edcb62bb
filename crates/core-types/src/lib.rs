pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Action, ArtifactKind, PortfolioKind};
pub use error::CoreError;
pub use structs::{AnalysisRequest, DateRange, FrontierArtifact, Instrument, PortfolioResult, RiskReturn};
