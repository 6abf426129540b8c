use crate::cli::open_catalog;
use crate::codes::{is_ancestor_or_self, level_of};
use crate::error::{AcxError, Result};
use crate::fmt::{code_line, indent};
use crate::models::AccountCode;
use crate::store::Store;

/// Case-insensitive substring match over the `CODE - Description` line.
pub fn line_matches(code: &AccountCode, needle: &str) -> bool {
    format!("{} - {}", code.account_code, code.description)
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

pub fn run(root: Option<&str>, depth: Option<i64>, filter: Option<&str>, color: bool) -> Result<()> {
    let (settings, conn) = open_catalog()?;
    let store = Store::new(&conn);
    let color = color || settings.color_hierarchy;

    let base_level = match root {
        Some(code) => {
            store.require(code)?;
            level_of(code)
        }
        None => 1,
    };
    if depth.is_some_and(|d| d < 0) {
        return Err(AcxError::Other("--depth must not be negative".to_string()));
    }

    let codes = store.all()?;
    if codes.is_empty() {
        println!("No account codes. Run `acx import <file>` to load them.");
        return Ok(());
    }
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());

    let mut printed = 0;
    for code in codes {
        if let Some(r) = root {
            if !is_ancestor_or_self(r, &code.account_code) {
                continue;
            }
        }
        if let Some(d) = depth {
            if code.level - base_level > d {
                continue;
            }
        }
        let line = code_line(&code.account_code, &code.description, code.level, color);
        match filter {
            Some(needle) => {
                if !line_matches(&code, needle) {
                    continue;
                }
                println!("{line}");
            }
            None => println!("{}{line}", indent(code.level - base_level + 1)),
        }
        printed += 1;
    }
    if printed == 0 {
        if let Some(needle) = filter {
            println!("No account codes match '{needle}'.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostFlags;

    fn code(account_code: &str, description: &str) -> AccountCode {
        AccountCode {
            id: 1,
            account_code: account_code.to_string(),
            level: level_of(account_code),
            description: description.to_string(),
            uom: String::new(),
            uom2: String::new(),
            metric_uom: String::new(),
            metric_uom2: String::new(),
            notes: String::new(),
            personal_notes: None,
            flags: CostFlags::EMPTY,
        }
    }

    #[test]
    fn test_line_matches_code_and_description() {
        let c = code("02.10", "Grading");
        assert!(line_matches(&c, "grad"));
        assert!(line_matches(&c, "02.1"));
        assert!(line_matches(&c, "10 - GR"));
        assert!(!line_matches(&c, "paving"));
    }
}
