pub mod broken_link;
pub mod retraction;
pub mod source_change;
