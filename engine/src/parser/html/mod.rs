pub mod tokenizer;
pub mod tree_builder;
pub mod stylesheets;

pub use stylesheets::extract_stylesheets;
pub use tree_builder::HtmlParser;
