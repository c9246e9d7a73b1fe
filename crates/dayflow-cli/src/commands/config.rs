use clap::Subcommand;
use dayflow_core::WorkSettings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current settings as TOML
    Show,
    /// Print the settings file path
    Path,
    /// Set a value by dotted key (e.g. splitting.min_fragment_minutes 20)
    Set { key: String, value: String },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let settings = WorkSettings::load_or_default();
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        ConfigAction::Path => {
            println!("{}", WorkSettings::path()?.display());
        }
        ConfigAction::Set { key, value } => {
            let settings = WorkSettings::load_or_default();
            let mut tree: toml::Value = toml::Value::try_from(&settings)?;
            set_dotted(&mut tree, &key, parse_value(&value))?;
            let updated: WorkSettings = tree.try_into()?;
            updated.save()?;
            println!("{key} updated");
        }
    }
    Ok(())
}

/// Interpret the value as bool, integer, or float before falling back to a
/// string.
fn parse_value(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(raw.to_string())
    }
}

fn set_dotted(
    tree: &mut toml::Value,
    key: &str,
    value: toml::Value,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cursor = tree;
    let parts: Vec<&str> = key.split('.').collect();
    let (last, path) = parts.split_last().ok_or("empty key")?;
    for part in path {
        cursor = cursor
            .get_mut(part)
            .ok_or_else(|| format!("unknown key segment '{part}'"))?;
    }
    let table = cursor
        .as_table_mut()
        .ok_or_else(|| format!("'{key}' does not address a table entry"))?;
    if !table.contains_key(*last) {
        return Err(format!("unknown key '{key}'").into());
    }
    table.insert((*last).to_string(), value);
    Ok(())
}
