pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    component_line, dim, error, header, info, kind_icon, section, success,
};
pub use table::{ComponentRow, TableBuilder, component_table, stats_table};
pub use theme::{theme, Theme};
