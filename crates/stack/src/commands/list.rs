use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use stack_config::Config;
use stack_orchestration::Catalog;

/// Render the catalog as a table, in execution order
pub fn catalog_table(catalog: &Catalog) -> Table {
    let mut specs: Vec<_> = catalog.iter().collect();
    specs.sort_by_key(|spec| spec.priority);

    let mut table = Table::new();
    table.set_header(vec![
        "Component",
        "Priority",
        "Dependencies",
        "Packages",
        "Description",
    ]);

    for spec in specs {
        let dependencies = spec
            .dependencies
            .iter()
            .map(|dep| {
                if catalog.contains(dep.as_str()) {
                    dep.to_string()
                } else {
                    format!("{} (external)", dep)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            Cell::new(spec.name.as_str()),
            Cell::new(spec.priority),
            Cell::new(dependencies),
            Cell::new(spec.definition.packages.len()),
            Cell::new(spec.definition.description.as_deref().unwrap_or("")),
        ]);
    }

    table
}

pub fn run(config: &Config) -> Result<()> {
    let catalog = Catalog::from_config(config).context("Invalid component catalog")?;
    println!("{}", catalog_table(&catalog));

    println!("{} components", catalog.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_orchestration::ComponentSpec;

    #[test]
    fn test_catalog_table() {
        let catalog = Catalog::new([
            ComponentSpec::new("nova", 3).depends_on(["db", "quantum"]),
            ComponentSpec::new("db", 1),
        ])
        .unwrap();

        let rendered = catalog_table(&catalog).to_string();
        assert!(rendered.contains("quantum (external)"));
        let db = rendered.find("db ").unwrap();
        let nova = rendered.find("nova").unwrap();
        assert!(db < nova);
    }
}
