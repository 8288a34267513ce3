//! Session state, pending-request coordination and render passes for the video dashboard.

pub mod coordinator;
pub mod refresh;
pub mod render;
pub mod session;
pub mod store;
pub mod view;

pub use coordinator::{Coordinator, DrainReport};
pub use refresh::AutoRefresh;
pub use render::{apply_event, Event, RenderOutcome, RenderPass};
pub use session::{SessionHandle, SessionRegistry};
pub use store::SessionStore;
pub use view::{ContentView, DashboardView};
