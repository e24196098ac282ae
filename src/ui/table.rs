use crate::component::Component;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// One line of a component listing
#[derive(Tabled)]
pub struct ComponentRow {
    #[tabled(rename = "Id")]
    pub id: i64,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Attributes")]
    pub attributes: String,
    #[tabled(rename = "Parent")]
    pub parent: String,
    #[tabled(rename = "Datafile")]
    pub datafile: String,
}

impl From<&Component> for ComponentRow {
    fn from(component: &Component) -> Self {
        Self {
            id: component.id.0,
            kind: component.kind().to_string(),
            name: component.name.clone(),
            attributes: component.attributes().to_string(),
            parent: component.parent.map(|p| p.to_string()).unwrap_or_default(),
            datafile: component.associated_datafile.clone().unwrap_or_default(),
        }
    }
}

pub fn component_table(components: &[Component]) -> String {
    if components.is_empty() {
        return String::new();
    }
    let rows: Vec<ComponentRow> = components.iter().map(ComponentRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
