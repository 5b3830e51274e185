//! Domain model (IDs, resources, steps, runs, outcomes, errors, events).

pub mod errors;
pub mod events;
pub mod ids;
pub mod outcome;
pub mod resource;
pub mod run;
pub mod step;

pub use self::errors::{
    FailurePhase, MUST_BE_ORG_ADMIN, NOT_CONFIGURED_FOR_BUILD, SagaError, StoreError,
};
pub use self::events::{Navigation, ToastLevel, WorkflowEvent};
pub use self::ids::{RunId, StepId};
pub use self::outcome::RunOutcome;
pub use self::resource::{
    App, AppRef, AssociationOptions, BranchConfiguration, BranchStatus, BuildTrigger, Permission,
    TeamAppAssociation, TeamKey,
};
pub use self::run::{RunStatus, WorkflowRun};
pub use self::step::{StepKind, StepStatus, WorkflowStep};
