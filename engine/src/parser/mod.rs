pub mod css;
pub mod html;
