//! Session domain: state model, conversation messages, commands, spec
//! sections, partial updates and the state reducer.

pub mod command;
pub mod message;
pub mod model;
pub mod reducer;
pub mod report;
pub mod section;
pub mod update;

pub use command::UserCommand;
pub use message::{ConversationMessage, MessageRole};
pub use model::{SessionState, UserProfile};
pub use reducer::merge;
pub use report::{
    Diagram, DiagramKind, MultiSpecBreakdown, SecurityCheck, SecurityReport, SubSpec,
    TechDebtIssue, TechDebtReport, MAX_SUB_SPECS,
};
pub use section::{SpecSection, FILLED_THRESHOLD, TOTAL_SECTIONS};
pub use update::StateUpdate;
