// Damecon state managers
// Managers own the stateful pieces of a window: its tabs, their selection and the window itself.

pub mod tab;
pub mod tab_collection;
pub mod window_host;
