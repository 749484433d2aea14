pub mod detail;
pub mod payload;

pub use detail::{TokenBreakdown, UNKNOWN_MODEL, UsageDetailRecord};
pub use payload::{ApiUsage, ModelUsage, RawDetail, RawTokens, UsagePayload};
