pub mod family_graph;
pub mod member_form;
pub mod toast;
