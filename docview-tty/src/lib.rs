//! Terminal front end: key translation, kitty graphics output and frame
//! layout for a [`docview_core::Session`].

mod keys;
mod kitty;
mod screen;

pub use keys::{translate_event, translate_key};
pub use kitty::{DrawParams, KittyRenderer};
pub use screen::{
    completion_lines, crop_render_image, format_status, index_lines, info_lines,
    truncate_with_ellipsis, CellMetrics, Layout, Line, LineStyle, Screen,
};
