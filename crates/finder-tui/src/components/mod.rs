pub mod help_overlay;
pub mod results_pane;
