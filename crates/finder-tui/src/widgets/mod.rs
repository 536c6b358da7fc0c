pub mod pane_chrome;
pub mod search_input;
pub mod status_bar;
