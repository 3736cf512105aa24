pub mod session_event;
pub mod session_manager;
pub mod session_state;
