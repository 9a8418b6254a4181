//! Anonymous import of every trait the runtime is driven through

pub use crate::settings::Setting as _;
pub use canbridge_core::ClockTree as _;
pub use canbridge_core::Monotonic as _;
pub use canbridge_core::SettingsStore as _;
pub use canbridge_core::Transport as _;
