pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod redaction;
pub mod types;

pub use error::{ErrorCategory, LlmError, UserFriendlyError};
pub use exit_codes::ExitCode;
pub use types::{
    FileId, PromptId, ProposalId, ProviderId, RfpId, RfpStatus, ScopeId, StageId, VendorId,
};
