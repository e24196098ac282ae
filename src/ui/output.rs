use crate::component::{Component, ComponentKind};
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn kind_icon(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Group => Icons::PACKAGE,
        ComponentKind::Quadrupole => Icons::MAGNET,
        ComponentKind::Crystal => Icons::CRYSTAL,
    }
}

/// One-line summary of a component: icon, kind-colored name, attributes, id
pub fn component_line(component: &Component) {
    println!(
        "{} {} {} {}",
        kind_icon(component.kind()),
        component.name.style(theme().kind(component.kind())),
        component.attributes(),
        dim(&component.id.to_string())
    );
}
