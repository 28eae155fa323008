pub mod calling;
pub mod constraints;
pub mod context;
pub mod signature;
pub mod system;

pub use context::{AnalysisContext, ContextTable};
pub use signature::{CpaSignature, CpaType};
pub use system::System;
