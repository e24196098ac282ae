use crate::component::ComponentKind;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub info: Style,
    pub dim: Style,
    pub group: Style,
    pub quadrupole: Style,
    pub crystal: Style,
}

impl Theme {
    /// Colored output on a terminal unless `NO_COLOR` is set
    pub fn detect() -> Self {
        if std::env::var_os("NO_COLOR").is_some() || !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            group: Style::new().blue().bold(),
            quadrupole: Style::new().green(),
            crystal: Style::new().magenta(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            group: Style::new(),
            quadrupole: Style::new(),
            crystal: Style::new(),
        }
    }

    pub fn kind(&self, kind: ComponentKind) -> Style {
        match kind {
            ComponentKind::Group => self.group.clone(),
            ComponentKind::Quadrupole => self.quadrupole.clone(),
            ComponentKind::Crystal => self.crystal.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
