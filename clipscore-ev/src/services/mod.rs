//! Service layer for clipscore-ev

pub mod coherence;
pub mod ledger;
pub mod missions;
pub mod pipeline;
pub mod plans;
pub mod policy;
pub mod quota;
pub mod quota_reset;
pub mod sessions;

pub use coherence::{CoherenceEvaluator, CoherenceResult};
pub use pipeline::{SharedRng, Submission, SubmissionOutcome, SubmissionPipeline};
pub use plans::{PaymentEvent, PlanChange};
pub use policy::{EvaluationPolicy, PlanLimits};
pub use quota::{check_quota, QuotaDecision};
pub use quota_reset::{run_sweep, SweepReport};
pub use sessions::{SessionService, StartOutcome};
