pub mod force_graph;
pub mod node_panel;
pub mod notifications;
pub mod settings_panel;
