pub mod engine;
pub mod footer;
pub mod merge;
pub mod numeric;
pub mod scaffold;
pub mod style;
pub mod subtotals;

pub use engine::TemplateEngine;
pub use scaffold::write_template;
