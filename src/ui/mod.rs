pub mod action_form;
pub mod dashboard;
pub mod dialogs;
pub mod keybindings;
mod paginated_list;
pub mod panels;
pub mod terminal;
pub mod workspace_view;

pub use action_form::{ActionForm, ActionMenu, FormResult};
pub use dashboard::Dashboard;
pub use dialogs::HelpDialog;
pub use workspace_view::WorkspaceView;
