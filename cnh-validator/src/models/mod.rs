mod requests;
mod session;
pub mod workflow;

pub use requests::{BeginResponse, HealthResponse};
pub use session::SessionRecord;
pub use workflow::{StepOneReply, StepOneRequest, StepTwoRequest};
